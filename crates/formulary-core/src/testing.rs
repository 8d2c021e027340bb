//! Formula-testing artifacts and the overall quality score.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::{EdgeCase, OptimizationKind, SimulatedOutcome, SuggestionPriority};
use crate::score::{clamp_score, mean};

// ---------------------------------------------------------------------------
// Test cases
// ---------------------------------------------------------------------------

/// A sample input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

impl SampleValue {
    /// Text as it is spliced into a formula: numbers bare, text quoted.
    pub fn literal(&self) -> String {
        match self {
            Self::Number(_) => self.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "\\'")),
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for SampleValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for SampleValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One generated test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub test_name: String,
    pub description: String,
    pub input_data: BTreeMap<String, SampleValue>,
    pub expected_result: String,
}

impl TestCase {
    pub fn new<K, V>(
        name: &str,
        description: &str,
        inputs: impl IntoIterator<Item = (K, V)>,
        expected: &str,
    ) -> Self
    where
        K: Into<String>,
        V: Into<SampleValue>,
    {
        Self {
            test_name: name.to_string(),
            description: description.to_string(),
            input_data: inputs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            expected_result: expected.to_string(),
        }
    }
}

/// Outcome of running one test case against one formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub test_name: String,
    pub passed: bool,
    pub substituted_formula: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulated_result: Option<SimulatedOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
}

/// Aggregated test outcome for one formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub label: String,
    pub formula: String,
    pub case_results: Vec<TestCaseResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub success_rate: f64,
    pub passed: bool,
}

impl TestResult {
    pub fn from_cases(label: impl Into<String>, formula: &str, case_results: Vec<TestCaseResult>) -> Self {
        let total_count = case_results.len();
        let passed_count = case_results.iter().filter(|r| r.passed).count();
        let success_rate = if total_count == 0 {
            0.0
        } else {
            passed_count as f64 / total_count as f64
        };
        Self {
            label: label.into(),
            formula: formula.to_string(),
            case_results,
            passed_count,
            total_count,
            success_rate: clamp_score(success_rate),
            passed: total_count > 0 && passed_count == total_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Performance, suggestions and edge cases
// ---------------------------------------------------------------------------

/// Size and cost estimates for one formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaCost {
    pub formula: String,
    pub complexity_score: u32,
    pub estimated_execution_time_ms: u64,
    pub estimated_memory_bytes: u64,
}

impl FormulaCost {
    /// Estimates cost from the static complexity: 10 ms per complexity
    /// point and two bytes per character.
    pub fn estimate(formula: &str) -> Self {
        let complexity_score = crate::formula::complexity_score(formula);
        Self {
            formula: formula.to_string(),
            complexity_score,
            estimated_execution_time_ms: u64::from(complexity_score) * 10,
            estimated_memory_bytes: formula.len() as u64 * 2,
        }
    }
}

/// Performance estimates for the primary formula and each alternative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub complexity_score: u32,
    pub estimated_execution_time_ms: u64,
    pub estimated_memory_bytes: u64,
    pub alternative_performance: Vec<FormulaCost>,
    pub recommendations: Vec<String>,
}

/// A rule-triggered improvement idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSuggestion {
    #[serde(rename = "type")]
    pub kind: OptimizationKind,
    pub suggestion: String,
    pub priority: SuggestionPriority,
    pub rationale: String,
}

/// One edge-case check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCaseTest {
    pub name: EdgeCase,
    pub description: String,
    pub expected_behavior: String,
    pub passed: bool,
}

/// All edge-case checks run against the primary formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCaseResults {
    pub tests: Vec<EdgeCaseTest>,
    pub passed_count: usize,
    pub total_count: usize,
    pub all_passed: bool,
}

impl EdgeCaseResults {
    pub fn new(tests: Vec<EdgeCaseTest>) -> Self {
        let passed_count = tests.iter().filter(|t| t.passed).count();
        let total_count = tests.len();
        Self {
            tests,
            passed_count,
            total_count,
            all_passed: passed_count == total_count,
        }
    }

    /// Share of passing checks, `0.0` when nothing ran.
    pub fn pass_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.passed_count as f64 / self.total_count as f64
        }
    }
}

// ---------------------------------------------------------------------------
// TestingResult
// ---------------------------------------------------------------------------

/// Recommendation emitted when testing itself fails.
pub const MANUAL_REVIEW: &str = "Testing failed. Please review formula manually.";

/// Weighted quality score:
/// `0.4·primary + 0.3·edge ratio + 0.2·max(0, (10 − complexity)/10) + 0.1·mean(alternatives)`,
/// clamped to `[0, 1]`.
pub fn overall_score(
    primary_success_rate: f64,
    edge_pass_ratio: f64,
    complexity: u32,
    alternative_success_rates: &[f64],
) -> f64 {
    let simplicity = ((10.0 - f64::from(complexity)) / 10.0).max(0.0);
    let alternatives = mean(alternative_success_rates.iter().copied());
    clamp_score(
        primary_success_rate * 0.4 + edge_pass_ratio * 0.3 + simplicity * 0.2 + alternatives * 0.1,
    )
}

/// Output of the formula-testing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestingResult {
    pub test_cases: Vec<TestCase>,
    pub primary_result: TestResult,
    pub alternative_results: Vec<TestResult>,
    pub performance: PerformanceMetrics,
    pub optimization_suggestions: Vec<OptimizationSuggestion>,
    pub edge_cases: EdgeCaseResults,
    pub overall_score: f64,
    pub recommendations: Vec<String>,
}

impl TestingResult {
    /// Result used when testing fails outright.
    pub fn fallback(primary_formula: &str) -> Self {
        Self {
            test_cases: Vec::new(),
            primary_result: TestResult::from_cases("Primary", primary_formula, Vec::new()),
            alternative_results: Vec::new(),
            performance: PerformanceMetrics::default(),
            optimization_suggestions: Vec::new(),
            edge_cases: EdgeCaseResults::default(),
            overall_score: 0.0,
            recommendations: vec![MANUAL_REVIEW.to_string()],
        }
    }
}
