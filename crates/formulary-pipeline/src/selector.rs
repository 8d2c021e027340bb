//! Stage 3: rank mapped functions, bind their parameters and order them.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, warn};

use formulary_catalog::Catalog;
use formulary_core::analysis::RequirementAnalysis;
use formulary_core::definition::{FunctionDefinition, ParameterDefinition};
use formulary_core::enums::{BindingSource, ValueType};
use formulary_core::mapping::{AvailableFunction, MappingResult};
use formulary_core::score::{clamp_score, mean};
use formulary_core::selection::{FunctionDependency, ParameterMapping, SelectedFunction, SelectionResult};

use crate::error::{Result, StageError};
use crate::extract;

/// Functions that earn the essential-function bonus.
pub const ESSENTIAL_FUNCTIONS: &[&str] = &["IF", "AND", "OR", "CONCATENATE", "TEXT", "VALUE"];

/// Recorded when nothing in the mapping applies to the requirement.
pub const NO_MATCH: &str = "No functions matched the requirement";

/// Confidence multiplier applied when validation finds problems.
const INVALID_PENALTY: f64 = 0.75;

/// `0.4·compatibility + 0.3·mentioned + 0.2·return type matches + 0.1·essential`,
/// capped at 1.
pub fn priority(compatibility: f64, mentioned: bool, output_matches: bool, essential: bool) -> f64 {
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    clamp_score(
        0.4 * compatibility + 0.3 * flag(mentioned) + 0.2 * flag(output_matches) + 0.1 * flag(essential),
    )
}

/// Stage 3 of the pipeline.
#[derive(Debug, Clone)]
pub struct FunctionSelector {
    catalog: Arc<Catalog>,
}

impl FunctionSelector {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn try_select(
        &self,
        analysis: &RequirementAnalysis,
        mapping: &MappingResult,
    ) -> Result<SelectionResult> {
        if mapping.available_functions.is_empty() {
            return Err(StageError::Validation("mapping has no available functions".into()));
        }

        let mut selected: Vec<SelectedFunction> = mapping
            .available_functions
            .iter()
            .filter_map(|available| self.candidate(analysis, available))
            .collect();
        if selected.is_empty() {
            debug!("no mapped function applies to the requirement");
            return Ok(SelectionResult::new(Vec::new(), vec![NO_MATCH.to_string()], 0.3, 0.0));
        }

        selected.sort_by(|a, b| {
            b.priority
                .total_cmp(&a.priority)
                .then(b.compatibility_score.total_cmp(&a.compatibility_score))
        });

        for function in &mut selected {
            function.parameter_mappings = bind_parameters(analysis, &function.parameters);
        }
        let errors = validate(&selected);
        link_dependencies(&mut selected);
        let selected = optimize(selected);

        let fully_supported = selected
            .iter()
            .filter(|f| mapping.available(&f.source_function).is_some_and(|a| a.fully_supported))
            .count();
        let optimization = fully_supported as f64 / selected.len() as f64;
        let penalty = if errors.is_empty() { 1.0 } else { INVALID_PENALTY };
        let confidence = mean(selected.iter().map(|f| f.compatibility_score)) * penalty;

        Ok(SelectionResult::new(selected, errors, confidence, optimization))
    }

    /// Selects functions for `analysis`; on failure returns
    /// [`SelectionResult::fallback`].
    pub fn select(
        &self,
        analysis: &RequirementAnalysis,
        mapping: &MappingResult,
        session: Option<&str>,
    ) -> SelectionResult {
        match self.try_select(analysis, mapping) {
            Ok(result) => {
                info!(
                    stage = "select",
                    selected = result.selected_functions.len(),
                    valid = result.validation_passed,
                    score = result.confidence_score,
                    "selection complete"
                );
                result
            }
            Err(e) => {
                warn!(stage = "select", session = session.unwrap_or("-"), error = %e, "selection failed, using fallback");
                SelectionResult::fallback()
            }
        }
    }

    /// A [`SelectedFunction`] for `available` if it applies to the
    /// requirement, without bindings or dependencies yet.
    fn candidate(
        &self,
        analysis: &RequirementAnalysis,
        available: &AvailableFunction,
    ) -> Option<SelectedFunction> {
        let source = available.source_function.as_str();
        let Some((_, definition)) = self.catalog.entry(source) else {
            debug!(function = source, "mapped function has no catalog entry");
            return None;
        };
        let applies = analysis.has_category(definition.category)
            || analysis.requests_operation(source)
            || analysis.mentions(source);
        if !applies {
            return None;
        }
        Some(selected_function(analysis, available, definition))
    }
}

fn selected_function(
    analysis: &RequirementAnalysis,
    available: &AvailableFunction,
    definition: &FunctionDefinition,
) -> SelectedFunction {
    let source = available.source_function.as_str();
    let priority = priority(
        available.compatibility_score,
        analysis.mentions(source),
        definition.return_type.matches_output(analysis.output_data_type),
        ESSENTIAL_FUNCTIONS.iter().any(|e| e.eq_ignore_ascii_case(source)),
    );
    SelectedFunction {
        function_name: available.target_function.clone(),
        source_function: available.source_function.clone(),
        syntax: available.syntax.clone(),
        description: available.description.clone(),
        return_type: definition.return_type,
        category: definition.category,
        compatibility_score: available.compatibility_score,
        priority,
        examples: definition.examples.clone(),
        parameters: definition.parameters.clone(),
        parameter_mappings: Vec::new(),
        dependencies: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Parameter binding
// ---------------------------------------------------------------------------

fn next_unused<'a>(fields: &'a [String], used: &BTreeSet<&str>) -> Option<&'a String> {
    fields.iter().find(|f| !used.contains(f.as_str()))
}

fn is_field_like(name: &str) -> bool {
    name == "field" || name.starts_with("field_") || name.ends_with("_field") || name.starts_with("value")
}

/// Literals read from the business logic for one function's parameters.
///
/// Each value is handed out once, in order of appearance, so sibling
/// parameters such as `text1` and `text2` bind distinct values. Comparison
/// operands and the "otherwise" value are kept out of the plain literal
/// pools.
#[derive(Debug, Default)]
struct Extractions {
    conditions: VecDeque<String>,
    texts: VecDeque<String>,
    numbers: VecDeque<String>,
    dates: VecDeque<String>,
    fallback: Option<String>,
}

impl Extractions {
    fn new(analysis: &RequirementAnalysis, parameters: &[ParameterDefinition]) -> Self {
        let text = analysis.business_logic.as_str();
        let fields = &analysis.field_references;
        let found = extract::conditions(text, fields);

        // One condition slot takes the combined expression; several take
        // one comparison each.
        let slots = parameters
            .iter()
            .filter(|p| p.name.to_ascii_lowercase().contains("condition"))
            .count();
        let mut conditions: VecDeque<String> = if slots > 1 && found.len() > 1 {
            found.iter().map(ToString::to_string).collect()
        } else {
            extract::condition(text, fields).into_iter().collect()
        };
        if conditions.is_empty() {
            conditions = fields.iter().map(|f| format!("NOT(IS_EMPTY({f}))")).collect();
        }

        let fallback = extract::fallback_value(text);
        let reserved: Vec<String> = found
            .into_iter()
            .map(|c| c.value)
            .chain(fallback.clone())
            .collect();

        Self {
            conditions,
            texts: without(extract::quoted_texts(text), &reserved),
            numbers: without(extract::numbers(text), &reserved),
            dates: extract::dates(text).into(),
            fallback,
        }
    }

    /// The next value for a parameter whose name asks for one.
    fn take(&mut self, name: &str) -> Option<(String, ValueType)> {
        if name.contains("false") || name.contains("else") {
            if let Some(value) = self.fallback.take() {
                let value_type = if value.starts_with('\'') {
                    ValueType::Text
                } else {
                    ValueType::Number
                };
                return Some((value, value_type));
            }
        }
        if name.contains("true") || name.contains("then") {
            if let Some(text) = self.texts.pop_front() {
                return Some((text, ValueType::Text));
            }
            if let Some(number) = self.numbers.pop_front() {
                return Some((number, ValueType::Number));
            }
        }
        if name.contains("condition") {
            if let Some(condition) = self.conditions.pop_front() {
                return Some((condition, ValueType::Boolean));
            }
        }
        if name.contains("text") || name.contains("string") {
            if let Some(text) = self.texts.pop_front() {
                return Some((text, ValueType::Text));
            }
        }
        if name.contains("number") || name.contains("amount") || name.contains("percent") {
            if let Some(number) = self.numbers.pop_front() {
                return Some((number, ValueType::Number));
            }
        }
        if name.contains("date") {
            if let Some(date) = self.dates.pop_front() {
                return Some((date, ValueType::Date));
            }
        }
        None
    }
}

/// `values` with one occurrence of each reserved value removed.
fn without(mut values: Vec<String>, reserved: &[String]) -> VecDeque<String> {
    for r in reserved {
        if let Some(i) = values.iter().position(|v| v == r) {
            values.remove(i);
        }
    }
    values.into()
}

/// Binds every parameter in order: a field reference with the same name, a
/// field reference for a field-like name, a value extracted from the text,
/// an unused field reference for text and date parameters, and finally the
/// type's default literal. Fields and extracted values are each used at most
/// once per function.
pub fn bind_parameters(
    analysis: &RequirementAnalysis,
    parameters: &[ParameterDefinition],
) -> Vec<ParameterMapping> {
    let fields = &analysis.field_references;
    let mut used: BTreeSet<&str> = BTreeSet::new();
    let mut extractions = Extractions::new(analysis, parameters);
    let mut mappings = Vec::with_capacity(parameters.len());

    for parameter in parameters {
        let name = parameter.name.to_ascii_lowercase();

        let exact = fields.iter().find(|f| f.eq_ignore_ascii_case(&name));
        let field = exact.or_else(|| {
            is_field_like(&name)
                .then(|| next_unused(fields, &used))
                .flatten()
        });
        if let Some(field) = field {
            used.insert(field.as_str());
            mappings.push(ParameterMapping::new(
                parameter,
                field.clone(),
                ValueType::Any,
                BindingSource::FieldReference,
            ));
            continue;
        }

        if let Some((value, value_type)) = extractions.take(&name) {
            mappings.push(ParameterMapping::new(parameter, value, value_type, BindingSource::Extracted));
            continue;
        }

        let wants_field = matches!(
            parameter.value_type,
            ValueType::Text | ValueType::Date | ValueType::DateTime
        );
        if let Some(field) = wants_field.then(|| next_unused(fields, &used)).flatten() {
            used.insert(field.as_str());
            mappings.push(ParameterMapping::new(
                parameter,
                field.clone(),
                ValueType::Any,
                BindingSource::FieldReference,
            ));
            continue;
        }

        let default_type = match parameter.value_type {
            ValueType::Any => ValueType::from(analysis.output_data_type),
            declared => declared,
        };
        mappings.push(ParameterMapping::new(
            parameter,
            default_type.default_literal(),
            default_type,
            BindingSource::TypeDefault,
        ));
    }
    mappings
}

fn validate(selected: &[SelectedFunction]) -> Vec<String> {
    let mut errors = Vec::new();
    for function in selected {
        for mapping in &function.parameter_mappings {
            if mapping.required && mapping.is_blank() {
                errors.push(format!(
                    "Required parameter '{}' for function '{}' is missing",
                    mapping.parameter_name, function.function_name
                ));
            } else if !mapping.value_type.compatible_with(mapping.parameter_type) {
                errors.push(format!(
                    "Parameter '{}' type mismatch in function '{}': expected {}",
                    mapping.parameter_name, function.function_name, mapping.parameter_type
                ));
            }
        }
    }
    errors
}

// ---------------------------------------------------------------------------
// Dependencies and ordering
// ---------------------------------------------------------------------------

/// Records `A → B` for every earlier `A` whose return type fits one of
/// `B`'s parameters.
fn link_dependencies(selected: &mut [SelectedFunction]) {
    for j in 1..selected.len() {
        let (earlier, rest) = selected.split_at_mut(j);
        let target = &mut rest[0];
        for source in earlier.iter() {
            let feeds = target
                .parameters
                .iter()
                .any(|p| source.return_type.compatible_with(p.value_type));
            if feeds {
                target
                    .dependencies
                    .push(FunctionDependency::output_input(&source.source_function, &target.source_function));
            }
        }
    }
}

/// Drops redundant functions and puts dependency-free functions first.
///
/// No function is currently considered redundant.
fn optimize(mut selected: Vec<SelectedFunction>) -> Vec<SelectedFunction> {
    selected.retain(|f| !is_redundant(f));
    selected.sort_by_key(|f| f.dependencies.len());
    selected
}

fn is_redundant(_function: &SelectedFunction) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulary_catalog::source::{CatalogSource, EmbeddedCatalog};
    use formulary_core::enums::{FunctionCategory, OutputDataType};
    use pretty_assertions::assert_eq;

    fn selector() -> FunctionSelector {
        FunctionSelector::new(Arc::new(EmbeddedCatalog.load().unwrap()))
    }

    fn mapping(functions: &[(&str, &str, f64)]) -> MappingResult {
        let available = functions
            .iter()
            .map(|(s, t, score)| AvailableFunction::new(*s, *t, "", "", *score, None))
            .collect();
        MappingResult::new(available, Vec::new(), 0.8, None)
    }

    #[test]
    fn priority_weights() {
        assert!((priority(1.0, true, true, true) - 1.0).abs() < 1e-12);
        assert!((priority(0.5, false, true, false) - 0.4).abs() < 1e-12);
        assert_eq!(priority(0.0, false, false, false), 0.0);
    }

    #[test]
    fn priority_is_monotonic_in_compatibility() {
        for flags in 0..8u8 {
            let (m, o, e) = (flags & 1 != 0, flags & 2 != 0, flags & 4 != 0);
            let mut last = -1.0;
            for step in 0..=10 {
                let p = priority(f64::from(step) / 10.0, m, o, e);
                assert!(p >= last);
                assert!((0.0..=1.0).contains(&p));
                last = p;
            }
        }
    }

    #[test]
    fn commission_binds_field_and_percentage() {
        let analysis = RequirementAnalysis::builder("Calculate the commission as 5% of the sales amount")
            .category(FunctionCategory::Math)
            .output(OutputDataType::Currency)
            .field_reference("sales_amount")
            .math_operations(["PERCENTAGE"])
            .build();
        let result = selector()
            .try_select(&analysis, &mapping(&[("PERCENTAGE", "MULTIPLY", 1.0)]))
            .unwrap();

        assert!(result.validation_passed);
        let function = &result.selected_functions[0];
        assert_eq!(function.function_name, "MULTIPLY");
        assert_eq!(function.bound("value").unwrap().bound_value, "sales_amount");
        assert_eq!(
            function.bound("value").unwrap().binding_source,
            BindingSource::FieldReference
        );
        assert_eq!(function.bound("percent_number").unwrap().bound_value, "0.05");
        assert_eq!(result.execution_plan.steps[0].parameters, "value=sales_amount, percent_number=0.05");
    }

    #[test]
    fn if_binds_extracted_condition_and_defaults() {
        let analysis = RequirementAnalysis::builder("If amount > 1000 label it High")
            .category(FunctionCategory::Logical)
            .output(OutputDataType::Text)
            .field_reference("amount")
            .build();
        let result = selector()
            .try_select(&analysis, &mapping(&[("IF", "IF", 1.0)]))
            .unwrap();
        let function = &result.selected_functions[0];
        assert_eq!(function.bound("condition").unwrap().bound_value, "amount > 1000");
        assert_eq!(function.bound("true_value").unwrap().bound_value, "''");
        assert_eq!(function.bound("true_value").unwrap().value_type, ValueType::Text);
        assert_eq!(
            function.bound("false_value").unwrap().binding_source,
            BindingSource::TypeDefault
        );
        // Mentioned, essential and compatible; the return type is Any.
        assert!((function.priority - 0.8).abs() < 1e-12);
    }

    #[test]
    fn text_parameters_take_unused_fields() {
        let analysis = RequirementAnalysis::builder("Join first name and last name")
            .category(FunctionCategory::Text)
            .output(OutputDataType::Text)
            .field_references(["first_name", "last_name"])
            .build();
        let catalog = EmbeddedCatalog.load().unwrap();
        let params = &catalog.function("CONCATENATE").unwrap().parameters;
        let bound: Vec<String> = bind_parameters(&analysis, params)
            .into_iter()
            .map(|m| m.bound_value)
            .collect();
        assert_eq!(bound, vec!["first_name", "last_name"]);
    }

    fn bound_values(text: &str, function: &str, fields: &[&str]) -> Vec<String> {
        let analysis = RequirementAnalysis::builder(text)
            .category(FunctionCategory::Logical)
            .output(OutputDataType::Text)
            .field_references(fields.iter().copied())
            .build();
        let catalog = EmbeddedCatalog.load().unwrap();
        let params = &catalog.function(function).unwrap().parameters;
        bind_parameters(&analysis, params)
            .into_iter()
            .map(|m| m.bound_value)
            .collect()
    }

    #[test]
    fn sibling_text_parameters_take_successive_literals() {
        assert_eq!(
            bound_values("Join 'Dear' and 'Customer'", "CONCATENATE", &[]),
            vec!["'Dear'", "'Customer'"]
        );
        // One literal: the second parameter falls through to the default.
        assert_eq!(bound_values("Prefix with 'Dear'", "CONCATENATE", &[]), vec!["'Dear'", "''"]);
    }

    #[test]
    fn sibling_conditions_take_one_comparison_each() {
        let text = "amount > 1000 and stage = 'Won'";
        assert_eq!(
            bound_values(text, "AND", &[]),
            vec!["amount > 1000", "stage = 'Won'"]
        );
        // A single condition slot gets the combined expression.
        assert_eq!(bound_values(text, "IF", &[])[0], "AND(amount > 1000, stage = 'Won')");
    }

    #[test]
    fn branch_values_come_from_the_text() {
        let text = "If amount > 1000 return 'High' otherwise 'Low'";
        assert_eq!(
            bound_values(text, "IF", &["amount"]),
            vec!["amount > 1000", "'High'", "'Low'"]
        );
    }

    #[test]
    fn ranked_by_priority_then_compatibility() {
        let analysis = RequirementAnalysis::builder("round the weekday")
            .categories([FunctionCategory::Math, FunctionCategory::DateTime])
            .build();
        let result = selector()
            .try_select(
                &analysis,
                &mapping(&[("ABS", "ABS", 1.0), ("WEEKDAY", "DAYOFWEEK", 0.7), ("ROUND", "ROUND", 1.0)]),
            )
            .unwrap();
        let ranked: Vec<&str> = result
            .by_priority()
            .iter()
            .map(|f| f.source_function.as_str())
            .collect();
        // ROUND and WEEKDAY are mentioned; ROUND is more compatible.
        assert_eq!(ranked, vec!["ROUND", "WEEKDAY", "ABS"]);
        assert_eq!(result.execution_plan.steps[0].function_name, "ROUND");
        assert!((result.optimization_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn dependencies_follow_type_compatibility() {
        let analysis = RequirementAnalysis::builder("length of the name, then add")
            .categories([FunctionCategory::Text, FunctionCategory::Math])
            .build();
        let result = selector()
            .try_select(&analysis, &mapping(&[("LEN", "LENGTH", 1.0), ("UPPER", "UPPER", 1.0), ("ADD", "ADD", 1.0)]))
            .unwrap();
        let deps = |name: &str| -> Vec<String> {
            result
                .selected_functions
                .iter()
                .find(|f| f.function_name == name)
                .unwrap()
                .dependencies
                .iter()
                .map(|d| d.source_function.clone())
                .collect()
        };
        // LEN returns a Number: it feeds ADD but not UPPER.
        assert!(deps("ADD").contains(&"LEN".to_string()));
        assert!(!deps("UPPER").contains(&"LEN".to_string()));
        let counts: Vec<usize> = result.selected_functions.iter().map(|f| f.dependencies.len()).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unmatched_mapping_reports_error() {
        let analysis = RequirementAnalysis::builder("plain words")
            .category(FunctionCategory::Aggregation)
            .build();
        let result = selector()
            .try_select(&analysis, &mapping(&[("UPPER", "UPPER", 1.0)]))
            .unwrap();
        assert!(result.selected_functions.is_empty());
        assert!(!result.validation_passed);
        assert_eq!(result.validation_errors, vec![NO_MATCH]);
        assert_eq!(result.confidence_score, 0.3);
    }

    #[test]
    fn empty_mapping_falls_back() {
        let analysis = RequirementAnalysis::builder("x").category(FunctionCategory::Math).build();
        let empty = MappingResult::new(Vec::new(), Vec::new(), 0.2, None);
        let result = selector().select(&analysis, &empty, None);
        assert_eq!(result, SelectionResult::fallback());
        assert_eq!(result.confidence_score, 0.3);
    }

    #[test]
    fn functions_outside_the_catalog_are_skipped() {
        let analysis = RequirementAnalysis::builder("basic").category(FunctionCategory::Math).build();
        let result = selector()
            .try_select(&analysis, &mapping(&[("NOPE", "NOPE", 1.0), ("ADD", "ADD", 1.0)]))
            .unwrap();
        let names: Vec<&str> = result.selected_functions.iter().map(|f| f.function_name.as_str()).collect();
        assert_eq!(names, vec!["ADD"]);
    }
}
