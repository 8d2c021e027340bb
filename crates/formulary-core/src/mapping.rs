//! Function-mapping artifacts.

use serde::{Deserialize, Serialize};

use crate::score::{clamp_score, mean};

/// Scores at or above this mark a mapping as fully supported.
pub const FULL_SUPPORT_THRESHOLD: f64 = 0.9;

/// Scores below this produce a compatibility warning.
pub const WARNING_THRESHOLD: f64 = 0.8;

/// A source function with a target-system equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableFunction {
    pub source_function: String,
    pub target_function: String,
    pub syntax: String,
    pub description: String,
    pub compatibility_score: f64,
    pub fully_supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitations: Option<String>,
}

impl AvailableFunction {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        syntax: impl Into<String>,
        description: impl Into<String>,
        score: f64,
        limitations: Option<String>,
    ) -> Self {
        let score = clamp_score(score);
        Self {
            source_function: source.into(),
            target_function: target.into(),
            syntax: syntax.into(),
            description: description.into(),
            compatibility_score: score,
            fully_supported: score >= FULL_SUPPORT_THRESHOLD,
            limitations,
        }
    }

    /// Warning text for entries below [`WARNING_THRESHOLD`].
    fn compatibility_warning(&self) -> Option<String> {
        if self.compatibility_score >= WARNING_THRESHOLD {
            return None;
        }
        let detail = self
            .limitations
            .clone()
            .unwrap_or_else(|| format!("compatibility score {:.2}", self.compatibility_score));
        Some(format!(
            "Function {} has limited compatibility: {detail}",
            self.target_function
        ))
    }
}

/// A requested operation with no target-system equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingFunction {
    pub source_function: String,
    pub reason: String,
    pub suggested_alternative: String,
}

impl MissingFunction {
    pub fn new(
        source: impl Into<String>,
        reason: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        Self {
            source_function: source.into(),
            reason: reason.into(),
            suggested_alternative: alternative.into(),
        }
    }
}

/// Output of the function-mapping stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResult {
    pub available_functions: Vec<AvailableFunction>,
    pub missing_functions: Vec<MissingFunction>,
    pub compatibility_warnings: Vec<String>,
    pub overall_compatibility: f64,
    pub confidence_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<String>,
}

impl MappingResult {
    /// Builds a result, deriving the overall compatibility and the warnings
    /// from the available functions.
    pub fn new(
        available_functions: Vec<AvailableFunction>,
        missing_functions: Vec<MissingFunction>,
        confidence_score: f64,
        ai_suggestions: Option<String>,
    ) -> Self {
        let overall = mean(available_functions.iter().map(|f| f.compatibility_score));
        let compatibility_warnings = available_functions
            .iter()
            .filter_map(AvailableFunction::compatibility_warning)
            .collect();
        Self {
            available_functions,
            missing_functions,
            compatibility_warnings,
            overall_compatibility: clamp_score(overall),
            confidence_score: clamp_score(confidence_score),
            ai_suggestions,
        }
    }

    /// Minimal result used when mapping fails outright.
    ///
    /// The single generic function carries a 0.3 score so the overall
    /// compatibility stays the mean of the available scores.
    pub fn fallback() -> Self {
        let basic = AvailableFunction::new(
            "BASIC",
            "ARITHMETIC",
            "value1 + value2",
            "Basic arithmetic operations",
            0.3,
            Some("Generic fallback mapping".into()),
        );
        Self::new(vec![basic], Vec::new(), 0.2, None)
    }

    /// Looks up an available function by source name (case-insensitive).
    pub fn available(&self, source: &str) -> Option<&AvailableFunction> {
        self.available_functions
            .iter()
            .find(|f| f.source_function.eq_ignore_ascii_case(source))
    }

    /// Target-system function names known to this mapping.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.available_functions
            .iter()
            .map(|f| f.target_function.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn func(source: &str, score: f64) -> AvailableFunction {
        AvailableFunction::new(source, source, "", "", score, None)
    }

    #[test]
    fn fully_supported_tracks_threshold() {
        assert!(func("A", 0.9).fully_supported);
        assert!(!func("B", 0.89).fully_supported);
        assert_eq!(func("C", 1.3).compatibility_score, 1.0);
    }

    #[test]
    fn overall_is_mean_of_scores() {
        let result = MappingResult::new(
            vec![func("A", 1.0), func("B", 0.6), func("C", 0.8)],
            Vec::new(),
            0.8,
            None,
        );
        assert!((result.overall_compatibility - 0.8).abs() < 1e-9);
    }

    #[test]
    fn overall_is_zero_without_functions() {
        let result = MappingResult::new(Vec::new(), Vec::new(), 0.8, None);
        assert_eq!(result.overall_compatibility, 0.0);
        assert!(result.compatibility_warnings.is_empty());
    }

    #[test]
    fn warnings_for_low_scores() {
        let partial = AvailableFunction::new(
            "VLOOKUP",
            "JOIN_LOOKUP",
            "",
            "",
            0.6,
            Some("Requires JOIN syntax".into()),
        );
        let result = MappingResult::new(
            vec![func("ADD", 1.0), partial, func("X", 0.7)],
            Vec::new(),
            0.8,
            None,
        );
        assert_eq!(
            result.compatibility_warnings,
            vec![
                "Function JOIN_LOOKUP has limited compatibility: Requires JOIN syntax",
                "Function X has limited compatibility: compatibility score 0.70",
            ]
        );
    }

    #[test]
    fn fallback_shape() {
        let result = MappingResult::fallback();
        assert_eq!(result.available_functions.len(), 1);
        assert_eq!(result.available_functions[0].target_function, "ARITHMETIC");
        assert_eq!(result.overall_compatibility, 0.3);
        assert_eq!(result.confidence_score, 0.2);
        assert_eq!(result.compatibility_warnings.len(), 1);
    }
}
