//! Pulls literal values out of business-logic text for parameter binding.
//!
//! Everything here is a pure function over the text; nothing guesses beyond
//! what the words say.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// `amount > 1000`, `status = 'Active'`, `score<=0.5`.
static SYMBOLIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([A-Za-z_][A-Za-z0-9_]*)\s*(>=|<=|!=|<>|=|>|<)\s*('[^']*'|"[^"]*"|-?\d+(?:\.\d+)?%?|[A-Za-z_][A-Za-z0-9_]*)"#,
    )
    .unwrap()
});

/// `amount is greater than 1000`, `discount at most 10%`, `status equals "Open"`.
static VERBAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b([A-Za-z_][A-Za-z0-9_]*)\s+(?:is\s+)?(greater than or equal to|less than or equal to|greater than|more than|at least|at most|less than|exceeds|above|below|under|over|equal to|equals|is)\s+('[^']*'|"[^"]*"|-?\d+(?:\.\d+)?%?)"#,
    )
    .unwrap()
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(-?\d+(?:\.\d+)?)(\s*%|\s+percent\b)?").unwrap());

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).unwrap());

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

/// `otherwise 'Low'`, `else return 0`.
static FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:otherwise|else)\b[\s,]*(?:(?:return|use|show|set\s+(?:it\s+)?to|it\s+is)\s+)?('[^']*'|"[^"]*"|-?\d+(?:\.\d+)?%?)"#,
    )
    .unwrap()
});

static OR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bor\b").unwrap());

/// Words that can precede a comparison without naming a field.
const NOT_FIELDS: &[&str] = &[
    "if", "when", "where", "while", "is", "it", "value", "the", "a", "an", "and", "or", "then",
    "else", "otherwise", "than", "not",
];

/// One comparison found in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub operator: &'static str,
    pub value: String,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

fn symbolic_operator(op: &str) -> &'static str {
    match op {
        ">=" => ">=",
        "<=" => "<=",
        "!=" | "<>" => "<>",
        ">" => ">",
        "<" => "<",
        _ => "=",
    }
}

fn verbal_operator(phrase: &str) -> &'static str {
    match phrase.to_ascii_lowercase().as_str() {
        "greater than or equal to" | "at least" => ">=",
        "less than or equal to" | "at most" => "<=",
        "greater than" | "more than" | "exceeds" | "above" | "over" => ">",
        "less than" | "below" | "under" => "<",
        _ => "=",
    }
}

/// Resolves the word before a comparison to a declared field reference.
fn resolve_field(word: &str, fields: &[String]) -> Option<String> {
    let lower = word.to_ascii_lowercase();
    let declared = fields.iter().find(|f| {
        let f = f.to_ascii_lowercase();
        f == lower || f.ends_with(&format!("_{lower}"))
    });
    match declared {
        Some(field) => Some(field.clone()),
        None if NOT_FIELDS.contains(&lower.as_str()) => fields.first().cloned(),
        None => Some(word.to_string()),
    }
}

/// Formats a number the way it appears in a formula: integers bare,
/// fractions in shortest form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Normalises a captured value: quotes become single quotes and
/// percentages become fractions.
fn literal(raw: &str) -> String {
    if let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
    {
        return format!("'{inner}'");
    }
    if let Some(number) = raw.strip_suffix('%') {
        if let Ok(n) = number.parse::<f64>() {
            return format_number(n / 100.0);
        }
    }
    raw.to_string()
}

/// Every comparison in `text`, in order of appearance.
pub fn conditions(text: &str, fields: &[String]) -> Vec<Condition> {
    let mut found: Vec<(usize, Condition)> = Vec::new();
    let captures = SYMBOLIC_RE
        .captures_iter(text)
        .map(|c| (c, true))
        .chain(VERBAL_RE.captures_iter(text).map(|c| (c, false)));
    for (cap, symbolic) in captures {
        let Some(field) = resolve_field(&cap[1], fields) else {
            continue;
        };
        let operator = if symbolic {
            symbolic_operator(&cap[2])
        } else {
            verbal_operator(&cap[2])
        };
        let condition = Condition {
            field,
            operator,
            value: literal(&cap[3]),
        };
        let start = cap.get(0).map_or(0, |m| m.start());
        if !found.iter().any(|(_, c)| *c == condition) {
            found.push((start, condition));
        }
    }
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, c)| c).collect()
}

/// A single boolean expression for every comparison in `text`.
///
/// Several comparisons are combined with `AND(...)`, or with `OR(...)` when
/// the text says "or".
pub fn condition(text: &str, fields: &[String]) -> Option<String> {
    let found = conditions(text, fields);
    match found.as_slice() {
        [] => None,
        [only] => Some(only.to_string()),
        many => {
            let joiner = if OR_RE.is_match(text) { "OR" } else { "AND" };
            let parts: Vec<String> = many.iter().map(Condition::to_string).collect();
            Some(format!("{joiner}({})", parts.join(", ")))
        }
    }
}

/// Every numeric literal in order, ignoring dates. `5%` becomes `0.05`.
pub fn numbers(text: &str) -> Vec<String> {
    let without_dates = DATE_RE.replace_all(text, " ");
    NUMBER_RE
        .captures_iter(&without_dates)
        .filter_map(|cap| {
            let value: f64 = cap[1].parse().ok()?;
            Some(if cap.get(2).is_some() {
                format_number(value / 100.0)
            } else {
                cap[1].to_string()
            })
        })
        .collect()
}

/// The first numeric literal, ignoring dates.
pub fn number(text: &str) -> Option<String> {
    numbers(text).into_iter().next()
}

/// Every quoted text literal in order, re-quoted with single quotes.
pub fn quoted_texts(text: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(text)
        .filter_map(|cap| {
            let inner = cap.get(1).or_else(|| cap.get(2))?.as_str();
            Some(format!("'{inner}'"))
        })
        .collect()
}

/// The first quoted text literal.
pub fn quoted_text(text: &str) -> Option<String> {
    quoted_texts(text).into_iter().next()
}

/// Every valid ISO date in order, as `DATE(y, m, d)` calls.
pub fn dates(text: &str) -> Vec<String> {
    DATE_RE
        .captures_iter(text)
        .filter_map(|cap| {
            let year: u32 = cap[1].parse().ok()?;
            let month: u32 = cap[2].parse().ok()?;
            let day: u32 = cap[3].parse().ok()?;
            if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                return None;
            }
            Some(format!("DATE({year}, {month}, {day})"))
        })
        .collect()
}

/// The first ISO date.
pub fn date(text: &str) -> Option<String> {
    dates(text).into_iter().next()
}

/// The literal named after "otherwise" or "else", if any.
pub fn fallback_value(text: &str) -> Option<String> {
    FALLBACK_RE.captures(text).map(|cap| literal(&cap[1]))
}
