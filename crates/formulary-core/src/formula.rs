//! Static checks over formula strings.
//!
//! These never evaluate a formula; they look only at its text.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A function call site: an identifier directly followed by `(`.
static CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

/// A call with an empty argument list, such as `TODAY()`.
static EMPTY_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)?\s*\(\s*\)").unwrap());

/// Functions that take no arguments.
const ZERO_ARGUMENT_FUNCTIONS: [&str; 4] = ["TODAY", "NOW", "CURRENT_DATE", "CURRENT_TIMESTAMP"];

/// Logical keywords counted by [`complexity_score`].
static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(AND|OR|IF)\b").unwrap());

/// Returns `true` if every `(` has a matching `)` and no prefix closes
/// more than it opened.
pub fn parentheses_balanced(formula: &str) -> bool {
    let mut depth: i64 = 0;
    for c in formula.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(formula: &str) -> String {
    formula.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Names of every function called in `formula`, in order of appearance.
pub fn called_functions(formula: &str) -> Vec<String> {
    CALL_RE
        .captures_iter(formula)
        .map(|c| c[1].to_ascii_uppercase())
        .collect()
}

/// Number of times `name(` is called in `formula` (case-insensitive).
pub fn call_count(formula: &str, name: &str) -> usize {
    called_functions(formula)
        .iter()
        .filter(|f| f.eq_ignore_ascii_case(name))
        .count()
}

/// Structural complexity: opening parentheses, arithmetic operators and the
/// `AND`/`OR`/`IF` keywords.
pub fn complexity_score(formula: &str) -> u32 {
    let parens = formula.matches('(').count();
    let operators = formula
        .chars()
        .filter(|c| matches!(c, '+' | '-' | '*' | '/'))
        .count();
    let keywords = KEYWORD_RE.find_iter(formula).count();
    (parens + operators + keywords) as u32
}

/// Static validation report for one candidate formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaValidation {
    pub label: String,
    pub formula: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub valid: bool,
}

impl FormulaValidation {
    /// Checks `formula` for structural problems.
    ///
    /// `known_functions` lists the function names the target system is
    /// known to accept; calls outside it only produce a warning. An empty
    /// set disables that check.
    pub fn check(
        label: impl Into<String>,
        formula: &str,
        known_functions: &BTreeSet<String>,
    ) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if formula.trim().is_empty() {
            errors.push("Formula is empty".to_string());
        } else {
            if !parentheses_balanced(formula) {
                errors.push("Unbalanced parentheses".to_string());
            }
            if formula.contains(",,") {
                errors.push("Double comma found".to_string());
            }
            let empty_call = EMPTY_CALL_RE.captures_iter(formula).any(|c| match c.get(1) {
                Some(name) => !ZERO_ARGUMENT_FUNCTIONS
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(name.as_str())),
                None => true,
            });
            if empty_call {
                warnings.push("Empty parameter list found".to_string());
            }
            if !known_functions.is_empty() {
                let unknown: BTreeSet<String> = called_functions(formula)
                    .into_iter()
                    .filter(|f| !known_functions.contains(f))
                    .collect();
                if !unknown.is_empty() {
                    warnings.push(format!(
                        "Some function names may not be recognized: {}",
                        unknown.into_iter().collect::<Vec<_>>().join(", ")
                    ));
                }
            }
        }

        Self {
            label: label.into(),
            formula: formula.to_string(),
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
