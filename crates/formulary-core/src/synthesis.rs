//! Formula-synthesis artifacts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::formula::FormulaValidation;
use crate::score::clamp_score;

/// Sentinel primary formula of the fallback result.
pub const FAILED_FORMULA: &str = "TEXT('Formula generation failed')";

/// Output of the formula-synthesis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResult {
    pub primary_formula: String,
    pub alternative_formulas: Vec<String>,
    pub validations: Vec<FormulaValidation>,
    pub all_formulas_valid: bool,
    pub explanation: String,
    pub usage_examples: Vec<String>,
    pub confidence_score: f64,
}

impl SynthesisResult {
    /// Builds a result from validated candidates; `all_formulas_valid` is
    /// derived from the validations.
    pub fn new(
        primary_formula: String,
        alternative_formulas: Vec<String>,
        validations: Vec<FormulaValidation>,
        explanation: String,
        usage_examples: Vec<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            all_formulas_valid: !validations.is_empty() && validations.iter().all(|v| v.valid),
            primary_formula,
            alternative_formulas,
            validations,
            explanation,
            usage_examples,
            confidence_score: clamp_score(confidence_score),
        }
    }

    /// Result used when no formula could be assembled.
    pub fn fallback() -> Self {
        let validation = FormulaValidation::check("Primary", FAILED_FORMULA, &BTreeSet::new());
        Self {
            primary_formula: FAILED_FORMULA.to_string(),
            alternative_formulas: Vec::new(),
            validations: vec![validation],
            all_formulas_valid: false,
            explanation: "Unable to generate formula due to insufficient information".to_string(),
            usage_examples: Vec::new(),
            confidence_score: 0.2,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.primary_formula == FAILED_FORMULA
    }

    /// Primary formula followed by every alternative.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_formula.as_str())
            .chain(self.alternative_formulas.iter().map(String::as_str))
    }
}
