//! Stage 5: exercise the synthesized formulas against generated samples.
//!
//! Nothing is evaluated for real. Each sample is spliced into the formula
//! text and the result is checked structurally; the outcome tag only says
//! which construct the formula leads with.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use formulary_core::analysis::RequirementAnalysis;
use formulary_core::enums::{
    EdgeCase, OptimizationKind, OutputDataType, SimulatedOutcome, SuggestionPriority,
};
use formulary_core::formula::{call_count, called_functions, complexity_score, parentheses_balanced};
use formulary_core::synthesis::SynthesisResult;
use formulary_core::testing::{
    EdgeCaseResults, EdgeCaseTest, FormulaCost, OptimizationSuggestion, PerformanceMetrics,
    SampleValue, TestCase, TestCaseResult, TestResult, TestingResult, overall_score,
};

use crate::error::{Result, StageError};

static NULL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bnull\b").unwrap());

const VALIDATION_FAILED: &str = "Formula validation failed";

/// Complexity above which a simplification is suggested.
const SUGGEST_SIMPLER_ABOVE: u32 = 7;

/// Complexity above which the formula is reported as hard to maintain.
const COMPLEX_ABOVE: u32 = 8;

const SLOW_ABOVE_MS: u64 = 1000;

const LONG_FORMULA_CHARS: usize = 200;

/// Stage 5 of the pipeline. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaTester;

impl FormulaTester {
    pub fn new() -> Self {
        Self
    }

    pub fn try_test(
        &self,
        analysis: &RequirementAnalysis,
        synthesis: &SynthesisResult,
    ) -> Result<TestingResult> {
        let primary = synthesis.primary_formula.trim();
        if primary.is_empty() {
            return Err(StageError::Validation("primary formula is empty".into()));
        }
        if synthesis.is_fallback() {
            return Err(StageError::Validation(
                "synthesis produced no usable formula".into(),
            ));
        }

        let test_cases = test_cases(analysis);
        debug!(cases = test_cases.len(), "generated test cases");

        let primary_result = run("Primary", primary, &test_cases);
        let alternative_results: Vec<TestResult> = synthesis
            .alternative_formulas
            .iter()
            .enumerate()
            .map(|(i, f)| run(&format!("Alternative {}", i + 1), f, &test_cases))
            .collect();

        let performance = performance(primary, &synthesis.alternative_formulas);
        let optimization_suggestions = suggestions(primary);
        let edge_cases = edge_cases(analysis.output_data_type, primary);

        let alternative_rates: Vec<f64> =
            alternative_results.iter().map(|r| r.success_rate).collect();
        let overall_score = overall_score(
            primary_result.success_rate,
            edge_cases.pass_ratio(),
            performance.complexity_score,
            &alternative_rates,
        );

        let recommendations = recommendations(
            &primary_result,
            &alternative_results,
            &performance,
            &edge_cases,
            &optimization_suggestions,
        );

        Ok(TestingResult {
            test_cases,
            primary_result,
            alternative_results,
            performance,
            optimization_suggestions,
            edge_cases,
            overall_score,
            recommendations,
        })
    }

    /// Tests the synthesized formulas; on failure returns
    /// [`TestingResult::fallback`].
    pub fn test(
        &self,
        analysis: &RequirementAnalysis,
        synthesis: &SynthesisResult,
        session: Option<&str>,
    ) -> TestingResult {
        match self.try_test(analysis, synthesis) {
            Ok(result) => {
                info!(
                    stage = "test",
                    score = result.overall_score,
                    passed = result.primary_result.passed,
                    "testing complete"
                );
                result
            }
            Err(e) => {
                warn!(stage = "test", session = session.unwrap_or("-"), error = %e, "testing failed, using fallback");
                TestingResult::fallback(&synthesis.primary_formula)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Test cases
// ---------------------------------------------------------------------------

fn test_cases(analysis: &RequirementAnalysis) -> Vec<TestCase> {
    let mut cases = match analysis.output_data_type {
        OutputDataType::Text => vec![
            TestCase::new(
                "BASIC_STRING_TEST",
                "Test basic string operations",
                [("text_field", "Sample Text"), ("name", "John Doe")],
                "Expected string result",
            ),
            TestCase::new(
                "EMPTY_STRING_TEST",
                "Test with empty strings",
                [("text_field", ""), ("name", "")],
                "",
            ),
        ],
        OutputDataType::Boolean => vec![
            TestCase::new(
                "TRUE_CONDITION_TEST",
                "Test condition that should return true",
                [("amount", SampleValue::from(1000.0)), ("status", "Active".into())],
                "true",
            ),
            TestCase::new(
                "FALSE_CONDITION_TEST",
                "Test condition that should return false",
                [("amount", SampleValue::from(100.0)), ("status", "Inactive".into())],
                "false",
            ),
        ],
        OutputDataType::Date => vec![TestCase::new(
            "CURRENT_DATE_TEST",
            "Test with current date",
            [("date_field", "2024-01-15")],
            "2024-01-15",
        )],
        OutputDataType::Number | OutputDataType::Currency | OutputDataType::Percent => vec![
            TestCase::new(
                "POSITIVE_NUMBER_TEST",
                "Test with positive numbers",
                [("value1", 100.0), ("value2", 200.0)],
                "300",
            ),
            TestCase::new(
                "NEGATIVE_NUMBER_TEST",
                "Test with negative numbers",
                [("value1", -50.0), ("value2", 100.0)],
                "50",
            ),
            TestCase::new(
                "ZERO_TEST",
                "Test with zero values",
                [("value1", 0.0), ("value2", 0.0)],
                "0",
            ),
        ],
    };

    if !analysis.field_references.is_empty() {
        let inputs: Vec<(String, String)> = analysis
            .field_references
            .iter()
            .map(|f| (f.clone(), format!("sample_value_{f}")))
            .collect();
        cases.push(TestCase::new(
            "FIELD_BASED_TEST",
            "Test with actual field references",
            inputs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            "field_based_result",
        ));
    }
    cases
}

/// Replaces each whole-word occurrence of an input name with its literal.
pub fn substitute(formula: &str, inputs: &BTreeMap<String, SampleValue>) -> Result<String> {
    let mut out = formula.to_string();
    for (name, value) in inputs {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(name)))
            .map_err(|e| StageError::Internal(format!("bad input name {name}: {e}")))?;
        let literal = value.literal();
        out = pattern
            .replace_all(&out, regex::NoExpand(&literal))
            .into_owned();
    }
    Ok(out)
}

fn simulate(formula: &str) -> SimulatedOutcome {
    if formula.contains("IF(") {
        SimulatedOutcome::Conditional
    } else if formula.contains("CONCAT") {
        SimulatedOutcome::Concatenated
    } else if formula.contains(['+', '-', '*', '/']) {
        SimulatedOutcome::Numeric
    } else {
        SimulatedOutcome::Generic
    }
}

fn execute(formula: &str, case: &TestCase) -> TestCaseResult {
    let failed = |substituted: String, message: String| TestCaseResult {
        test_name: case.test_name.clone(),
        passed: false,
        substituted_formula: substituted,
        simulated_result: None,
        error_message: Some(message),
        execution_time_ms: 0,
    };

    let substituted = match substitute(formula, &case.input_data) {
        Ok(s) => s,
        Err(e) => return failed(formula.to_string(), e.to_string()),
    };
    if substituted.trim().is_empty() || !parentheses_balanced(&substituted) {
        return failed(substituted, VALIDATION_FAILED.to_string());
    }
    TestCaseResult {
        test_name: case.test_name.clone(),
        passed: true,
        simulated_result: Some(simulate(&substituted)),
        error_message: None,
        execution_time_ms: FormulaCost::estimate(&substituted).estimated_execution_time_ms,
        substituted_formula: substituted,
    }
}

fn run(label: &str, formula: &str, cases: &[TestCase]) -> TestResult {
    let results = cases.iter().map(|c| execute(formula, c)).collect();
    TestResult::from_cases(label, formula, results)
}

// ---------------------------------------------------------------------------
// Performance and suggestions
// ---------------------------------------------------------------------------

fn is_nested(formula: &str) -> bool {
    formula.contains("((") || formula.matches('(').count() > 2
}

fn has_repeated_concatenation(formula: &str) -> bool {
    let long = call_count(formula, "CONCATENATE");
    let short = call_count(formula, "CONCAT");
    long > 1 || short > 1 || (long > 0 && short > 0)
}

fn has_complex_branching(formula: &str) -> bool {
    let branches = call_count(formula, "IF");
    let multi_way = called_functions(formula)
        .iter()
        .any(|f| f == "CASE" || f == "CASE_WHEN");
    branches > 2 || (branches > 0 && multi_way)
}

fn performance(primary: &str, alternatives: &[String]) -> PerformanceMetrics {
    let cost = FormulaCost::estimate(primary);
    let mut recommendations = Vec::new();
    if cost.complexity_score > COMPLEX_ABOVE {
        recommendations.push("Consider breaking complex formula into smaller components".to_string());
    }
    if is_nested(primary) {
        recommendations.push("Flatten nested functions to improve readability and performance".to_string());
    }
    if primary.len() > LONG_FORMULA_CHARS {
        recommendations.push("Formula is quite long. Consider using intermediate calculations".to_string());
    }
    PerformanceMetrics {
        complexity_score: cost.complexity_score,
        estimated_execution_time_ms: cost.estimated_execution_time_ms,
        estimated_memory_bytes: cost.estimated_memory_bytes,
        alternative_performance: alternatives.iter().map(|f| FormulaCost::estimate(f)).collect(),
        recommendations,
    }
}

fn suggestion(
    kind: OptimizationKind,
    suggestion: &str,
    priority: SuggestionPriority,
    rationale: &str,
) -> OptimizationSuggestion {
    OptimizationSuggestion {
        kind,
        suggestion: suggestion.to_string(),
        priority,
        rationale: rationale.to_string(),
    }
}

fn suggestions(formula: &str) -> Vec<OptimizationSuggestion> {
    let mut out = Vec::new();
    if is_nested(formula) {
        out.push(suggestion(
            OptimizationKind::NestedFunctions,
            "Consider flattening nested functions for better performance",
            SuggestionPriority::High,
            "Nested functions can impact performance. Consider breaking into simpler steps.",
        ));
    }
    if has_repeated_concatenation(formula) {
        out.push(suggestion(
            OptimizationKind::StringConcatenation,
            "Multiple string concatenations detected. Consider using a single CONCAT function",
            SuggestionPriority::Medium,
            "CONCAT(field1, field2, field3) is more efficient than CONCATENATE(CONCATENATE(field1, field2), field3)",
        ));
    }
    if has_complex_branching(formula) {
        out.push(suggestion(
            OptimizationKind::ConditionalLogic,
            "Complex conditional logic detected. Consider using CASE statements",
            SuggestionPriority::Medium,
            "CASE statements can be more readable and efficient than nested IF statements",
        ));
    }
    if complexity_score(formula) > SUGGEST_SIMPLER_ABOVE {
        out.push(suggestion(
            OptimizationKind::ComplexityReduction,
            "High complexity detected. Consider simplifying the formula",
            SuggestionPriority::High,
            "Break complex formulas into smaller, more manageable parts",
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Edge cases
// ---------------------------------------------------------------------------

fn guards_null(formula: &str) -> bool {
    ["ISNULL", "IS_NULL", "ISBLANK", "IS_EMPTY"]
        .iter()
        .any(|g| formula.contains(g))
}

fn edge(name: EdgeCase, description: &str, expected: &str, passed: bool) -> EdgeCaseTest {
    EdgeCaseTest {
        name,
        description: description.to_string(),
        expected_behavior: expected.to_string(),
        passed,
    }
}

fn edge_cases(output: OutputDataType, formula: &str) -> EdgeCaseResults {
    let mut tests = vec![edge(
        EdgeCase::NullValueHandling,
        "Test formula behavior with null values",
        "Should handle null values gracefully",
        !NULL_RE.is_match(formula) || guards_null(formula),
    )];
    if output == OutputDataType::Text {
        tests.push(edge(
            EdgeCase::EmptyStringHandling,
            "Test formula behavior with empty strings",
            "Should handle empty strings appropriately",
            ["ISBLANK", "IS_EMPTY", "LEN", "TRIM"]
                .iter()
                .any(|g| formula.contains(g)),
        ));
    }
    if output.is_numeric() && formula.contains('/') {
        tests.push(edge(
            EdgeCase::DivisionByZero,
            "Test formula behavior with division by zero",
            "Should handle division by zero gracefully",
            formula.contains("IF") || formula.contains("CASE"),
        ));
    }
    if output.is_numeric() {
        tests.push(edge(
            EdgeCase::LargeNumberHandling,
            "Test formula behavior with large numbers",
            "Should handle large numbers without overflow",
            true,
        ));
    }
    EdgeCaseResults::new(tests)
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

fn recommendations(
    primary: &TestResult,
    alternatives: &[TestResult],
    performance: &PerformanceMetrics,
    edge_cases: &EdgeCaseResults,
    suggestions: &[OptimizationSuggestion],
) -> Vec<String> {
    let mut out = vec![if primary.passed {
        "Primary formula passed all tests and is ready for production use".to_string()
    } else {
        "Primary formula failed some tests. Review and fix before deployment".to_string()
    }];
    if performance.complexity_score > COMPLEX_ABOVE {
        out.push("Formula complexity is high. Consider breaking into smaller components".into());
    }
    if performance.estimated_execution_time_ms > SLOW_ABOVE_MS {
        out.push("Estimated execution time is high. Consider optimization".into());
    }
    if !edge_cases.all_passed {
        out.push("Some edge cases failed. Add proper error handling".into());
    }
    if alternatives.iter().any(|a| a.passed) {
        out.push("Alternative formulas available for different scenarios".into());
    }
    if suggestions
        .iter()
        .any(|s| s.priority == SuggestionPriority::High)
    {
        out.push("High priority optimizations available. Consider implementing".into());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulary_core::testing::MANUAL_REVIEW;
    use pretty_assertions::assert_eq;

    fn analysis(output: OutputDataType, fields: &[&str]) -> RequirementAnalysis {
        RequirementAnalysis::builder("test requirement")
            .output(output)
            .field_references(fields.iter().copied())
            .build()
    }

    fn synthesis(primary: &str, alternatives: &[&str]) -> SynthesisResult {
        SynthesisResult::new(
            primary.to_string(),
            alternatives.iter().map(|s| s.to_string()).collect(),
            Vec::new(),
            String::new(),
            Vec::new(),
            0.8,
        )
    }

    #[test]
    fn numeric_cases_substitute_operands() {
        let result = FormulaTester
            .try_test(
                &analysis(OutputDataType::Number, &[]),
                &synthesis("MULTIPLY(value1, value2)", &["MULTIPLY(value1,value2)"]),
            )
            .unwrap();
        let names: Vec<&str> = result.test_cases.iter().map(|c| c.test_name.as_str()).collect();
        assert_eq!(names, vec!["POSITIVE_NUMBER_TEST", "NEGATIVE_NUMBER_TEST", "ZERO_TEST"]);

        let first = &result.primary_result.case_results[0];
        assert_eq!(first.substituted_formula, "MULTIPLY(100, 200)");
        assert_eq!(first.simulated_result, Some(SimulatedOutcome::Generic));
        assert_eq!(first.execution_time_ms, 10);
        assert_eq!(
            result.primary_result.case_results[1].simulated_result,
            Some(SimulatedOutcome::Numeric)
        );
        assert!(result.primary_result.passed);
        assert_eq!(result.primary_result.success_rate, 1.0);

        // null + large number, both pass
        assert_eq!(result.edge_cases.total_count, 2);
        assert!(result.edge_cases.all_passed);

        // 0.4 + 0.3 + 0.2 * 0.9 + 0.1
        assert!((result.overall_score - 0.98).abs() < 1e-9);
        assert_eq!(
            result.recommendations,
            vec![
                "Primary formula passed all tests and is ready for production use",
                "Alternative formulas available for different scenarios",
            ]
        );
    }

    #[test]
    fn substitution_respects_word_boundaries() {
        let inputs: BTreeMap<String, SampleValue> = [
            ("value1".to_string(), SampleValue::from(7.0)),
            ("name".to_string(), SampleValue::from("O'Brien")),
        ]
        .into_iter()
        .collect();
        let out = substitute("ADD(value1, value10, first_name, name)", &inputs).unwrap();
        assert_eq!(out, r"ADD(7, value10, first_name, 'O\'Brien')");
    }

    #[test]
    fn boolean_cases_and_branch_outcome() {
        let result = FormulaTester
            .try_test(
                &analysis(OutputDataType::Boolean, &[]),
                &synthesis("IF(amount > 1000, true, false)", &[]),
            )
            .unwrap();
        let first = &result.primary_result.case_results[0];
        assert_eq!(first.test_name, "TRUE_CONDITION_TEST");
        assert_eq!(first.substituted_formula, "IF(1000 > 1000, true, false)");
        assert_eq!(first.simulated_result, Some(SimulatedOutcome::Conditional));
        assert_eq!(result.edge_cases.total_count, 1);
        assert!(result.optimization_suggestions.is_empty());
    }

    #[test]
    fn unbalanced_formula_fails_every_case() {
        let result = FormulaTester
            .try_test(&analysis(OutputDataType::Number, &["amount"]), &synthesis("ADD(amount, 1", &[]))
            .unwrap();
        assert_eq!(result.test_cases.len(), 4);
        assert_eq!(result.primary_result.passed_count, 0);
        assert!(!result.primary_result.passed);
        for case in &result.primary_result.case_results {
            assert_eq!(case.error_message.as_deref(), Some("Formula validation failed"));
            assert!(case.simulated_result.is_none());
        }
        assert_eq!(
            result.recommendations[0],
            "Primary formula failed some tests. Review and fix before deployment"
        );
    }

    #[test]
    fn text_output_checks_empty_strings() {
        let result = FormulaTester
            .try_test(
                &analysis(OutputDataType::Text, &["first_name", "last_name"]),
                &synthesis("CONCATENATE(first_name, ' ', last_name)", &[]),
            )
            .unwrap();
        let field_case = result.test_cases.last().unwrap();
        assert_eq!(field_case.test_name, "FIELD_BASED_TEST");
        assert_eq!(
            result.primary_result.case_results.last().unwrap().substituted_formula,
            "CONCATENATE('sample_value_first_name', ' ', 'sample_value_last_name')"
        );
        let empty = result
            .edge_cases
            .tests
            .iter()
            .find(|t| t.name == EdgeCase::EmptyStringHandling)
            .unwrap();
        assert!(!empty.passed);
        assert!(
            result
                .recommendations
                .contains(&"Some edge cases failed. Add proper error handling".to_string())
        );
    }

    #[test]
    fn division_needs_a_guard() {
        let bare = edge_cases(OutputDataType::Currency, "amount / quantity");
        let division = bare
            .tests
            .iter()
            .find(|t| t.name == EdgeCase::DivisionByZero)
            .unwrap();
        assert!(!division.passed);

        let guarded = edge_cases(OutputDataType::Currency, "IF(quantity = 0, 0, amount / quantity)");
        assert!(guarded.all_passed);
    }

    #[test]
    fn null_literal_needs_a_guard() {
        assert!(!edge_cases(OutputDataType::Boolean, "IF(x, null, 1)").all_passed);
        assert!(edge_cases(OutputDataType::Boolean, "IF(IS_EMPTY(x), null, 1)").all_passed);
        assert!(edge_cases(OutputDataType::Boolean, "NULLIF(x)").all_passed);
    }

    #[test]
    fn nested_formula_triggers_suggestions() {
        let formula = "ROUND(MULTIPLY(ADD(a, b), c), 2)";
        let kinds: Vec<OptimizationKind> = suggestions(formula).iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![OptimizationKind::NestedFunctions]);

        let heavy = "IF(a > 1, IF(b > 2, IF(c > 3, ADD(a, b) * 2, 1), 2), 3)";
        let kinds: Vec<OptimizationKind> = suggestions(heavy).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OptimizationKind::NestedFunctions,
                OptimizationKind::ConditionalLogic,
                OptimizationKind::ComplexityReduction,
            ]
        );

        let concat = suggestions("CONCAT(CONCATENATE(a, b), c)");
        assert!(concat.iter().any(|s| s.kind == OptimizationKind::StringConcatenation));
    }

    #[test]
    fn performance_covers_alternatives() {
        let perf = performance("ADD(a, b)", &["ADD(a,b)".to_string(), "SUM(a, b, c)".to_string()]);
        assert_eq!(perf.complexity_score, 1);
        assert_eq!(perf.estimated_execution_time_ms, 10);
        assert_eq!(perf.estimated_memory_bytes, 18);
        assert_eq!(perf.alternative_performance.len(), 2);
        assert!(perf.recommendations.is_empty());
    }

    #[test]
    fn fallback_synthesis_is_not_tested() {
        let result = FormulaTester.test(
            &analysis(OutputDataType::Number, &[]),
            &SynthesisResult::fallback(),
            Some("s-1"),
        );
        assert_eq!(result.overall_score, 0.0);
        assert_eq!(result.recommendations, vec![MANUAL_REVIEW]);
        assert!(result.test_cases.is_empty());
    }
}
