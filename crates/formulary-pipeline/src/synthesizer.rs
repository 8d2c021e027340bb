//! Stage 4: assemble formula strings from the selected functions.
//!
//! The primary formula follows the requirement's complexity tier. Three
//! alternative renderings are offered next to it, and every candidate is
//! statically validated before it leaves the stage.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use formulary_core::analysis::RequirementAnalysis;
use formulary_core::enums::{BindingSource, ComplexityLevel, FunctionCategory, ValueType};
use formulary_core::formula::{FormulaValidation, normalize_whitespace};
use formulary_core::mapping::MappingResult;
use formulary_core::selection::{ParameterMapping, SelectedFunction, SelectionResult};
use formulary_core::synthesis::SynthesisResult;

use crate::error::{Result, StageError};
use crate::extract;

/// Confidence of a synthesis whose candidates all validate.
const BASE_CONFIDENCE: f64 = 0.8;

/// Applied when any candidate fails validation.
const INVALID_PENALTY: f64 = 0.75;

/// Functions the synthesizer itself may emit, on top of the mapped targets.
const BUILTIN_FUNCTIONS: &[&str] = &[
    "IF", "CASE_WHEN", "AND", "OR", "NOT", "IS_EMPTY", "IS_NULL", "DATE", "TODAY", "NOW", "TEXT",
];

/// Stage 4 of the pipeline. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaSynthesizer;

impl FormulaSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn try_synthesize(
        &self,
        analysis: &RequirementAnalysis,
        mapping: &MappingResult,
        selection: &SelectionResult,
    ) -> Result<SynthesisResult> {
        let ranked = selection.by_priority();
        if ranked.is_empty() {
            return Err(StageError::Validation("no functions were selected".into()));
        }

        let primary = optimize(&primary_formula(analysis, &ranked));
        if primary.is_empty() {
            return Err(StageError::Internal("primary formula rendered empty".into()));
        }

        let mut alternatives: Vec<String> = Vec::new();
        for candidate in [
            optimized_variant(&ranked),
            verbose_variant(analysis, &ranked, &primary),
            compact_variant(&primary),
        ]
        .into_iter()
        .flatten()
        {
            let candidate = optimize(&candidate);
            if !candidate.is_empty() && candidate != primary && !alternatives.contains(&candidate) {
                alternatives.push(candidate);
            }
        }

        let known = known_functions(mapping);
        let mut validations = vec![FormulaValidation::check("Primary", &primary, &known)];
        validations.extend(
            alternatives
                .iter()
                .enumerate()
                .map(|(i, f)| FormulaValidation::check(format!("Alternative {}", i + 1), f, &known)),
        );
        let all_valid = validations.iter().all(|v| v.valid);
        for v in validations.iter().filter(|v| !v.valid) {
            debug!(label = %v.label, errors = ?v.errors, "candidate failed validation");
        }

        let confidence = if all_valid {
            BASE_CONFIDENCE
        } else {
            BASE_CONFIDENCE * INVALID_PENALTY
        };
        Ok(SynthesisResult::new(
            primary.clone(),
            alternatives,
            validations,
            explanation(analysis, &primary),
            usage_examples(&primary),
            confidence,
        ))
    }

    /// Synthesizes formulas; on failure returns [`SynthesisResult::fallback`].
    pub fn synthesize(
        &self,
        analysis: &RequirementAnalysis,
        mapping: &MappingResult,
        selection: &SelectionResult,
        session: Option<&str>,
    ) -> SynthesisResult {
        match self.try_synthesize(analysis, mapping, selection) {
            Ok(result) => {
                info!(
                    stage = "synthesize",
                    primary = %result.primary_formula,
                    alternatives = result.alternative_formulas.len(),
                    valid = result.all_formulas_valid,
                    "synthesis complete"
                );
                result
            }
            Err(e) => {
                warn!(stage = "synthesize", session = session.unwrap_or("-"), error = %e, "synthesis failed, using fallback");
                SynthesisResult::fallback()
            }
        }
    }
}

fn known_functions(mapping: &MappingResult) -> BTreeSet<String> {
    mapping
        .target_names()
        .chain(BUILTIN_FUNCTIONS.iter().copied())
        .map(str::to_ascii_uppercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn is_quoted(value: &str) -> bool {
    value.starts_with('\'') || value.starts_with('"')
}

/// A bound value as it appears in a formula, or `None` when blank.
fn argument(mapping: &ParameterMapping) -> Option<String> {
    if mapping.is_blank() {
        return None;
    }
    let value = mapping.bound_value.trim();
    let quote = mapping.parameter_type == ValueType::Text
        && mapping.binding_source != BindingSource::FieldReference
        && !is_quoted(value);
    Some(if quote {
        format!("'{value}'")
    } else {
        value.to_string()
    })
}

fn arguments(function: &SelectedFunction, skip: usize) -> Vec<String> {
    function
        .parameter_mappings
        .iter()
        .skip(skip)
        .filter_map(argument)
        .collect()
}

fn call(name: &str, args: &[String], separator: &str) -> String {
    format!("{name}({})", args.join(separator))
}

/// `NAME(arg1, arg2, ...)` with blank arguments left out.
pub fn render(function: &SelectedFunction) -> String {
    call(&function.function_name, &arguments(function, 0), ", ")
}

/// `outer(render(inner), outer's arguments after the first)`.
fn chain(inner: &SelectedFunction, outer: &SelectedFunction) -> String {
    let mut args = vec![render(inner)];
    args.extend(arguments(outer, 1));
    call(&outer.function_name, &args, ", ")
}

fn bound_argument(function: &SelectedFunction, parameter: &str) -> Option<String> {
    function.bound(parameter).and_then(argument)
}

fn is_branch(function: &SelectedFunction) -> bool {
    function.function_name.eq_ignore_ascii_case("IF")
}

fn is_multi_way(function: &SelectedFunction) -> bool {
    function.function_name.eq_ignore_ascii_case("CASE_WHEN")
        || ["CASE", "NESTED_IF"]
            .iter()
            .any(|s| function.source_function.eq_ignore_ascii_case(s))
}

fn output_default(analysis: &RequirementAnalysis) -> String {
    ValueType::from(analysis.output_data_type)
        .default_literal()
        .to_string()
}

// ---------------------------------------------------------------------------
// Primary formula
// ---------------------------------------------------------------------------

fn primary_formula(analysis: &RequirementAnalysis, ranked: &[&SelectedFunction]) -> String {
    match analysis.complexity_level {
        ComplexityLevel::Simple => render(ranked[0]),
        ComplexityLevel::Medium => medium(analysis, ranked),
        ComplexityLevel::Complex => complex(analysis, ranked),
    }
}

fn logical<'a>(ranked: &[&'a SelectedFunction]) -> Option<&'a SelectedFunction> {
    ranked
        .iter()
        .copied()
        .find(|f| f.category == FunctionCategory::Logical)
}

fn top_non_logical<'a>(ranked: &[&'a SelectedFunction]) -> Option<&'a SelectedFunction> {
    ranked
        .iter()
        .copied()
        .find(|f| f.category != FunctionCategory::Logical)
}

fn medium(analysis: &RequirementAnalysis, ranked: &[&SelectedFunction]) -> String {
    if ranked.len() == 1 {
        return render(ranked[0]);
    }
    match logical(ranked) {
        Some(f) if is_branch(f) => {
            let condition = bound_argument(f, "condition").unwrap_or_else(|| "true".to_string());
            let when_true = top_non_logical(ranked)
                .map(render)
                .or_else(|| bound_argument(f, "true_value"))
                .unwrap_or_else(|| output_default(analysis));
            let when_false =
                bound_argument(f, "false_value").unwrap_or_else(|| output_default(analysis));
            call(&f.function_name, &[condition, when_true, when_false], ", ")
        }
        Some(f) if is_multi_way(f) => multi_way(analysis, f),
        _ => chain(ranked[0], ranked[1]),
    }
}

/// A multi-way branch over the tested expression. The value and result
/// slots are named placeholders for the author to fill in.
fn multi_way(analysis: &RequirementAnalysis, function: &SelectedFunction) -> String {
    let subject = analysis
        .field_references
        .first()
        .cloned()
        .or_else(|| {
            function
                .parameter_mappings
                .first()
                .and_then(argument)
        })
        .unwrap_or_else(|| "field_value".to_string());
    let args: Vec<String> = std::iter::once(subject)
        .chain(
            ["'value1'", "'result1'", "'value2'", "'result2'", "'default_result'"]
                .into_iter()
                .map(String::from),
        )
        .collect();
    call("CASE_WHEN", &args, ", ")
}

fn complex(analysis: &RequirementAnalysis, ranked: &[&SelectedFunction]) -> String {
    match logical(ranked) {
        Some(f) if is_branch(f) => {
            let condition = extract::condition(&analysis.business_logic, &analysis.field_references)
                .or_else(|| bound_argument(f, "condition"))
                .unwrap_or_else(|| "true".to_string());
            let when_true = top_non_logical(ranked)
                .map(render)
                .or_else(|| bound_argument(f, "true_value"))
                .unwrap_or_else(|| output_default(analysis));
            let when_false = extract::fallback_value(&analysis.business_logic)
                .or_else(|| unused_literal(analysis, &[condition.as_str(), when_true.as_str()]))
                .unwrap_or_else(|| output_default(analysis));
            call(&f.function_name, &[condition, when_true, when_false], ", ")
        }
        _ if ranked.len() >= 2 => chain(ranked[0], ranked[1]),
        _ => render(ranked[0]),
    }
}

/// The first quoted or numeric literal in the business logic that is not a
/// comparison operand and does not already appear in `used`.
fn unused_literal(analysis: &RequirementAnalysis, used: &[&str]) -> Option<String> {
    let text = analysis.business_logic.as_str();
    let operands: Vec<String> = extract::conditions(text, &analysis.field_references)
        .into_iter()
        .map(|c| c.value)
        .collect();
    extract::quoted_texts(text)
        .into_iter()
        .chain(extract::numbers(text))
        .find(|literal| !operands.contains(literal) && !used.iter().any(|u| u.contains(literal.as_str())))
}

// ---------------------------------------------------------------------------
// Alternatives
// ---------------------------------------------------------------------------

/// Two-level chain along the first recorded dependency.
fn optimized_variant(ranked: &[&SelectedFunction]) -> Option<String> {
    ranked.iter().find_map(|consumer| {
        let dependency = consumer.dependencies.first()?;
        let producer = ranked
            .iter()
            .find(|f| f.source_function == dependency.source_function)?;
        Some(chain(producer, consumer))
    })
}

/// The primary formula guarded against an empty field.
fn verbose_variant(
    analysis: &RequirementAnalysis,
    ranked: &[&SelectedFunction],
    primary: &str,
) -> Option<String> {
    let field = ranked.iter().find_map(|f| {
        f.parameter_mappings
            .iter()
            .find(|m| m.binding_source == BindingSource::FieldReference && !m.is_blank())
    })?;
    Some(format!(
        "IF(IS_EMPTY({}), {}, {primary})",
        field.bound_value.trim(),
        output_default(analysis)
    ))
}

fn compact_variant(primary: &str) -> Option<String> {
    primary.contains(", ").then(|| primary.replace(", ", ","))
}

// ---------------------------------------------------------------------------
// Optimization, explanation and examples
// ---------------------------------------------------------------------------

fn optimize(formula: &str) -> String {
    let formula = normalize_whitespace(formula);
    let formula = flatten_nested(formula);
    simplify_redundant(formula)
}

/// No rewrite rules for nested expressions yet.
fn flatten_nested(formula: String) -> String {
    formula
}

/// No rewrite rules for redundant operations yet.
fn simplify_redundant(formula: String) -> String {
    formula
}

fn explanation(analysis: &RequirementAnalysis, primary: &str) -> String {
    let behaviour = if primary.starts_with("IF(") {
        "uses conditional logic to return different values based on a condition."
    } else if primary.starts_with("CASE") {
        "uses multi-way branching to handle different scenarios."
    } else {
        "processes the input data according to the specified requirements."
    };
    format!(
        "Formula Explanation:\nBusiness Logic: {}\nExpected Output: {}\n\nPrimary Formula: {primary}\nThis formula {behaviour}",
        analysis.business_logic, analysis.output_data_type
    )
}

fn usage_examples(primary: &str) -> Vec<String> {
    if primary.starts_with("IF(") {
        vec![
            "Example 1: IF(amount > 1000, 'High', 'Low')".to_string(),
            "Example 2: IF(status = 'Active', 'Enabled', 'Disabled')".to_string(),
        ]
    } else if primary.contains("CONCAT") {
        vec![
            "Example 1: CONCATENATE(firstName, ' ', lastName)".to_string(),
            "Example 2: CONCAT('Hello ', name, '!')".to_string(),
        ]
    } else {
        vec![format!("Example usage: {primary}")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulary_core::definition::ParameterDefinition;
    use formulary_core::enums::OutputDataType;
    use formulary_core::mapping::AvailableFunction;
    use formulary_core::selection::FunctionDependency;
    use pretty_assertions::assert_eq;

    fn param(name: &str, value_type: ValueType) -> ParameterDefinition {
        ParameterDefinition {
            name: name.to_string(),
            value_type,
            description: String::new(),
            required: true,
        }
    }

    fn function(
        name: &str,
        category: FunctionCategory,
        return_type: ValueType,
        priority: f64,
        bindings: &[(&str, ValueType, &str, BindingSource)],
    ) -> SelectedFunction {
        let parameters: Vec<ParameterDefinition> =
            bindings.iter().map(|(n, t, _, _)| param(n, *t)).collect();
        let parameter_mappings = parameters
            .iter()
            .zip(bindings)
            .map(|(p, (_, t, v, s))| ParameterMapping::new(p, *v, *t, *s))
            .collect();
        SelectedFunction {
            function_name: name.to_string(),
            source_function: name.to_string(),
            syntax: String::new(),
            description: String::new(),
            return_type,
            category,
            compatibility_score: 1.0,
            priority,
            examples: Vec::new(),
            parameters,
            parameter_mappings,
            dependencies: Vec::new(),
        }
    }

    fn multiply() -> SelectedFunction {
        function(
            "MULTIPLY",
            FunctionCategory::Math,
            ValueType::Number,
            0.9,
            &[
                ("value1", ValueType::Number, "value1", BindingSource::TypeDefault),
                ("value2", ValueType::Number, "value2", BindingSource::TypeDefault),
            ],
        )
    }

    fn branch() -> SelectedFunction {
        function(
            "IF",
            FunctionCategory::Logical,
            ValueType::Any,
            0.8,
            &[
                ("condition", ValueType::Boolean, "amount > 1000", BindingSource::Extracted),
                ("true_value", ValueType::Any, "'High'", BindingSource::Extracted),
                ("false_value", ValueType::Any, "0", BindingSource::TypeDefault),
            ],
        )
    }

    fn mapping_for(names: &[&str]) -> MappingResult {
        let available = names
            .iter()
            .map(|n| AvailableFunction::new(*n, *n, "", "", 1.0, None))
            .collect();
        MappingResult::new(available, Vec::new(), 0.8, None)
    }

    fn analysis(level: ComplexityLevel, text: &str) -> RequirementAnalysis {
        RequirementAnalysis::builder(text)
            .output(OutputDataType::Number)
            .complexity(level)
            .build()
    }

    fn selection(functions: Vec<SelectedFunction>) -> SelectionResult {
        SelectionResult::new(functions, Vec::new(), 0.9, 1.0)
    }

    #[test]
    fn simple_renders_the_top_function_verbatim() {
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Simple, "multiply two values"),
                &mapping_for(&["MULTIPLY"]),
                &selection(vec![multiply()]),
            )
            .unwrap();
        assert_eq!(result.primary_formula, "MULTIPLY(value1, value2)");
        assert_eq!(result.alternative_formulas, vec!["MULTIPLY(value1,value2)"]);
        assert!(result.all_formulas_valid);
        assert_eq!(result.confidence_score, 0.8);
        assert_eq!(result.usage_examples, vec!["Example usage: MULTIPLY(value1, value2)"]);
    }

    #[test]
    fn text_arguments_are_quoted_once() {
        let concat = function(
            "CONCAT",
            FunctionCategory::Text,
            ValueType::Text,
            0.9,
            &[
                ("text1", ValueType::Text, "Dear", BindingSource::Extracted),
                ("text2", ValueType::Text, "'Sir'", BindingSource::Extracted),
                ("text3", ValueType::Text, "last_name", BindingSource::FieldReference),
                ("text4", ValueType::Text, "  ", BindingSource::TypeDefault),
            ],
        );
        assert_eq!(render(&concat), "CONCAT('Dear', 'Sir', last_name)");
    }

    #[test]
    fn medium_branch_wraps_the_computation() {
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Medium, "if amount > 1000 multiply"),
                &mapping_for(&["MULTIPLY", "IF"]),
                &selection(vec![branch(), multiply()]),
            )
            .unwrap();
        assert_eq!(result.primary_formula, "IF(amount > 1000, MULTIPLY(value1, value2), 0)");
        assert!(result.explanation.ends_with(
            "This formula uses conditional logic to return different values based on a condition."
        ));
        assert_eq!(result.usage_examples.len(), 2);
    }

    #[test]
    fn medium_without_logic_chains_two_functions() {
        let round = function(
            "ROUND",
            FunctionCategory::Math,
            ValueType::Number,
            0.5,
            &[
                ("value", ValueType::Number, "0", BindingSource::TypeDefault),
                ("decimals", ValueType::Number, "2", BindingSource::Extracted),
            ],
        );
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Medium, "multiply then round"),
                &mapping_for(&["MULTIPLY", "ROUND"]),
                &selection(vec![multiply(), round]),
            )
            .unwrap();
        assert_eq!(result.primary_formula, "ROUND(MULTIPLY(value1, value2), 2)");
    }

    #[test]
    fn multi_way_branch() {
        let case = function(
            "CASE_WHEN",
            FunctionCategory::Logical,
            ValueType::Any,
            0.9,
            &[("expression", ValueType::Any, "stage", BindingSource::FieldReference)],
        );
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Medium, "map the stage"),
                &mapping_for(&["CASE_WHEN", "MULTIPLY"]),
                &selection(vec![case, multiply()]),
            )
            .unwrap();
        assert_eq!(
            result.primary_formula,
            "CASE_WHEN(stage, 'value1', 'result1', 'value2', 'result2', 'default_result')"
        );
    }

    #[test]
    fn complex_branch_extracts_the_condition() {
        let text = "If the sales amount is at least 5000 and region = 'West' pay a bonus";
        let analysis = RequirementAnalysis::builder(text)
            .output(OutputDataType::Currency)
            .field_reference("sales_amount")
            .complexity(ComplexityLevel::Complex)
            .build();
        let result = FormulaSynthesizer
            .try_synthesize(&analysis, &mapping_for(&["MULTIPLY", "IF"]), &selection(vec![branch(), multiply()]))
            .unwrap();
        assert_eq!(
            result.primary_formula,
            "IF(AND(sales_amount >= 5000, region = 'West'), MULTIPLY(value1, value2), 0)"
        );
    }

    #[test]
    fn complex_branch_uses_the_otherwise_value() {
        let text = "If amount > 1000 return 'High' otherwise 'Low'";
        let analysis = RequirementAnalysis::builder(text)
            .output(OutputDataType::Text)
            .field_reference("amount")
            .complexity(ComplexityLevel::Complex)
            .build();
        let label = function(
            "UPPER",
            FunctionCategory::Text,
            ValueType::Text,
            0.9,
            &[("text", ValueType::Text, "'High'", BindingSource::Extracted)],
        );
        let result = FormulaSynthesizer
            .try_synthesize(&analysis, &mapping_for(&["UPPER", "IF"]), &selection(vec![branch(), label]))
            .unwrap();
        assert_eq!(result.primary_formula, "IF(amount > 1000, UPPER('High'), 'Low')");
    }

    #[test]
    fn complex_branch_falls_back_to_an_unused_literal() {
        let text = "If amount > 1000 pay 50 else nothing, capped at 200";
        let analysis = RequirementAnalysis::builder(text)
            .output(OutputDataType::Number)
            .field_reference("amount")
            .complexity(ComplexityLevel::Complex)
            .build();
        let pay = function(
            "ABS",
            FunctionCategory::Math,
            ValueType::Number,
            0.9,
            &[("number", ValueType::Number, "50", BindingSource::Extracted)],
        );
        let result = FormulaSynthesizer
            .try_synthesize(&analysis, &mapping_for(&["ABS", "IF"]), &selection(vec![branch(), pay]))
            .unwrap();
        assert_eq!(result.primary_formula, "IF(amount > 1000, ABS(50), 200)");
    }

    #[test]
    fn optimized_variant_finds_the_producer_by_source() {
        // PERCENTAGE and MULTIPLY both render as MULTIPLY.
        let mut percentage = function(
            "MULTIPLY",
            FunctionCategory::Math,
            ValueType::Number,
            0.95,
            &[
                ("value", ValueType::Number, "sales_amount", BindingSource::FieldReference),
                ("percent_number", ValueType::Number, "0.05", BindingSource::Extracted),
            ],
        );
        percentage.source_function = "PERCENTAGE".to_string();
        let mut product = multiply();
        product
            .dependencies
            .push(FunctionDependency::output_input("PERCENTAGE", "MULTIPLY"));
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Simple, "commission"),
                &mapping_for(&["MULTIPLY"]),
                &selection(vec![product, percentage]),
            )
            .unwrap();
        assert_eq!(result.primary_formula, "MULTIPLY(sales_amount, 0.05)");
        assert_eq!(
            result.alternative_formulas[0],
            "MULTIPLY(MULTIPLY(sales_amount, 0.05), value2)"
        );
    }

    #[test]
    fn alternatives_follow_dependencies_and_fields() {
        let mut round = function(
            "ROUND",
            FunctionCategory::Math,
            ValueType::Number,
            0.5,
            &[
                ("value", ValueType::Number, "price", BindingSource::FieldReference),
                ("decimals", ValueType::Number, "2", BindingSource::Extracted),
            ],
        );
        round.dependencies.push(FunctionDependency::output_input("MULTIPLY", "ROUND"));
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Simple, "round the product"),
                &mapping_for(&["MULTIPLY", "ROUND"]),
                &selection(vec![multiply(), round]),
            )
            .unwrap();
        assert_eq!(result.primary_formula, "MULTIPLY(value1, value2)");
        assert_eq!(
            result.alternative_formulas,
            vec![
                "ROUND(MULTIPLY(value1, value2), 2)",
                "IF(IS_EMPTY(price), 0, MULTIPLY(value1, value2))",
                "MULTIPLY(value1,value2)",
            ]
        );
        let labels: Vec<&str> = result.validations.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["Primary", "Alternative 1", "Alternative 2", "Alternative 3"]);
        assert!(result.validations.iter().all(|v| v.warnings.is_empty()));
    }

    #[test]
    fn unknown_functions_only_warn() {
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Simple, "x"),
                &mapping_for(&["ADD"]),
                &selection(vec![multiply()]),
            )
            .unwrap();
        assert!(result.all_formulas_valid);
        assert!(result.validations[0].warnings[0].contains("MULTIPLY"));
    }

    #[test]
    fn empty_selection_falls_back() {
        let result = FormulaSynthesizer.synthesize(
            &analysis(ComplexityLevel::Simple, "x"),
            &MappingResult::fallback(),
            &SelectionResult::fallback(),
            None,
        );
        assert!(result.is_fallback());
        assert!(!result.all_formulas_valid);
        assert!(result.alternative_formulas.is_empty());
    }

    #[test]
    fn explanation_snapshot() {
        let result = FormulaSynthesizer
            .try_synthesize(
                &analysis(ComplexityLevel::Simple, "Multiply quantity by price"),
                &mapping_for(&["MULTIPLY"]),
                &selection(vec![multiply()]),
            )
            .unwrap();
        insta::assert_snapshot!(result.explanation, @r"
        Formula Explanation:
        Business Logic: Multiply quantity by price
        Expected Output: Number

        Primary Formula: MULTIPLY(value1, value2)
        This formula processes the input data according to the specified requirements.
        ");
    }
}
