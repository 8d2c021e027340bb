//! Human-readable rendering of pipeline artifacts, shared by the stage,
//! `generate` and `chat` commands.

use formulary_core::analysis::RequirementAnalysis;
use formulary_core::mapping::MappingResult;
use formulary_core::selection::SelectionResult;
use formulary_core::synthesis::SynthesisResult;
use formulary_core::testing::TestingResult;

use crate::output::{accent, field, heading, list, output_table, pass_fail, score, warn};

const LABEL: usize = 14;

fn joined<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn analysis(analysis: &RequirementAnalysis) {
    println!("{}", heading("Analysis"));
    field("logic", &analysis.business_logic, LABEL);
    field("categories", joined(&analysis.function_categories), LABEL);
    field("output", analysis.output_data_type, LABEL);
    field("fields", joined(&analysis.field_references), LABEL);
    field("patterns", joined(&analysis.conditional_patterns), LABEL);
    let operations: Vec<&str> = analysis.operations().collect();
    field("operations", joined(&operations), LABEL);
    field("complexity", analysis.complexity_level, LABEL);
    field("confidence", score(analysis.confidence_score), LABEL);
    println!();
}

pub fn mapping(mapping: &MappingResult) {
    println!("{}", heading("Mapping"));
    let rows: Vec<Vec<String>> = mapping
        .available_functions
        .iter()
        .map(|f| {
            vec![
                f.source_function.clone(),
                f.target_function.clone(),
                format!("{:.2}", f.compatibility_score),
                f.limitations.clone().unwrap_or_default(),
            ]
        })
        .collect();
    output_table(&["SOURCE", "TARGET", "SCORE", "LIMITATIONS"], &rows);
    for missing in &mapping.missing_functions {
        println!(
            "  {} {}: {} ({})",
            warn("missing"),
            missing.source_function,
            missing.reason,
            missing.suggested_alternative
        );
    }
    list("Warnings", &mapping.compatibility_warnings);
    if let Some(suggestions) = &mapping.ai_suggestions {
        println!("{}\n{}", heading("Suggestions"), suggestions.trim());
    }
    field("compatibility", score(mapping.overall_compatibility), LABEL);
    field("confidence", score(mapping.confidence_score), LABEL);
    println!();
}

pub fn selection(selection: &SelectionResult) {
    println!("{}", heading("Selection"));
    let rows: Vec<Vec<String>> = selection
        .selected_functions
        .iter()
        .map(|f| {
            vec![
                f.function_name.clone(),
                f.category.to_string(),
                format!("{:.2}", f.priority),
                f.parameter_summary(),
            ]
        })
        .collect();
    output_table(&["FUNCTION", "CATEGORY", "PRIORITY", "PARAMETERS"], &rows);
    list("Validation errors", &selection.validation_errors);
    let plan: Vec<String> = selection
        .execution_plan
        .steps
        .iter()
        .map(|s| format!("{}. {} -> {}", s.step_number, s.description, s.expected_output))
        .collect();
    list("Execution plan", &plan);
    field("valid", pass_fail(selection.validation_passed), LABEL);
    field("confidence", score(selection.confidence_score), LABEL);
    field("optimization", score(selection.optimization_score), LABEL);
    println!();
}

pub fn synthesis(synthesis: &SynthesisResult) {
    println!("{}", heading("Synthesis"));
    field("formula", accent(&synthesis.primary_formula), LABEL);
    for (i, alternative) in synthesis.alternative_formulas.iter().enumerate() {
        field(&format!("alternative {}", i + 1), alternative, LABEL);
    }
    for validation in synthesis.validations.iter().filter(|v| !v.valid || !v.warnings.is_empty()) {
        for error in &validation.errors {
            println!("  {} {}: {}", warn("error"), validation.label, error);
        }
        for warning in &validation.warnings {
            println!("  {} {}: {}", warn("warning"), validation.label, warning);
        }
    }
    field("confidence", score(synthesis.confidence_score), LABEL);
    println!("\n{}", synthesis.explanation.trim());
    list("Usage", &synthesis.usage_examples);
    println!();
}

pub fn testing(testing: &TestingResult) {
    println!("{}", heading("Testing"));
    let rows: Vec<Vec<String>> = std::iter::once(&testing.primary_result)
        .chain(&testing.alternative_results)
        .map(|r| {
            vec![
                r.label.clone(),
                format!("{}/{}", r.passed_count, r.total_count),
                if r.passed { "PASS" } else { "FAIL" }.to_string(),
                r.formula.clone(),
            ]
        })
        .collect();
    output_table(&["FORMULA", "CASES", "RESULT", "TEXT"], &rows);

    let edges: Vec<String> = testing
        .edge_cases
        .tests
        .iter()
        .map(|t| format!("{} {}", if t.passed { "ok  " } else { "fail" }, t.name))
        .collect();
    list("Edge cases", &edges);

    let suggestions: Vec<String> = testing
        .optimization_suggestions
        .iter()
        .map(|s| format!("[{}] {}", s.priority, s.suggestion))
        .collect();
    list("Optimizations", &suggestions);
    list("Recommendations", &testing.recommendations);
    field("complexity", testing.performance.complexity_score, LABEL);
    field("score", score(testing.overall_score), LABEL);
    println!();
}
