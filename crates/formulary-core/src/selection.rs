//! Function-selection artifacts: ranked functions, parameter bindings,
//! dependencies and the execution plan.

use serde::{Deserialize, Serialize};

use crate::definition::ParameterDefinition;
use crate::enums::{BindingSource, ComplexityLevel, FunctionCategory, ValueType};
use crate::score::clamp_score;

/// Dependency kind recorded between two selected functions.
pub const OUTPUT_INPUT: &str = "OUTPUT_INPUT";

/// A value bound to one formal parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMapping {
    pub parameter_name: String,
    pub parameter_type: ValueType,
    pub required: bool,
    pub description: String,
    pub bound_value: String,
    /// Declared type of `bound_value`.
    pub value_type: ValueType,
    pub binding_source: BindingSource,
}

impl ParameterMapping {
    pub fn new(
        parameter: &ParameterDefinition,
        bound_value: impl Into<String>,
        value_type: ValueType,
        binding_source: BindingSource,
    ) -> Self {
        Self {
            parameter_name: parameter.name.clone(),
            parameter_type: parameter.value_type,
            required: parameter.required,
            description: parameter.description.clone(),
            bound_value: bound_value.into(),
            value_type,
            binding_source,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.bound_value.trim().is_empty()
    }
}

/// Producer/consumer edge between two selected functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDependency {
    pub source_function: String,
    pub target_function: String,
    pub kind: String,
    pub description: String,
}

impl FunctionDependency {
    /// Records that the output of `source` feeds an input of `target`.
    pub fn output_input(source: &str, target: &str) -> Self {
        Self {
            source_function: source.to_string(),
            target_function: target.to_string(),
            kind: OUTPUT_INPUT.to_string(),
            description: format!("Output of {source} feeds into {target}"),
        }
    }
}

/// A mapped function chosen for the formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFunction {
    pub function_name: String,
    pub source_function: String,
    pub syntax: String,
    pub description: String,
    pub return_type: ValueType,
    pub category: FunctionCategory,
    pub compatibility_score: f64,
    pub priority: f64,
    pub examples: Vec<String>,
    pub parameters: Vec<ParameterDefinition>,
    pub parameter_mappings: Vec<ParameterMapping>,
    pub dependencies: Vec<FunctionDependency>,
}

impl SelectedFunction {
    /// Bound value of the named parameter, if any.
    pub fn bound(&self, parameter: &str) -> Option<&ParameterMapping> {
        self.parameter_mappings
            .iter()
            .find(|m| m.parameter_name.eq_ignore_ascii_case(parameter))
    }

    /// `name=value` pairs joined by commas, or `none`.
    pub fn parameter_summary(&self) -> String {
        if self.parameter_mappings.is_empty() {
            return "none".to_string();
        }
        self.parameter_mappings
            .iter()
            .map(|m| format!("{}={}", m.parameter_name, m.bound_value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One step of an [`ExecutionPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub step_number: usize,
    pub function_name: String,
    pub description: String,
    pub parameters: String,
    pub expected_output: ValueType,
}

/// Ordered evaluation sequence for the selected functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
    pub estimated_complexity: ComplexityLevel,
    pub estimated_performance: String,
}

impl ExecutionPlan {
    /// One step per function, in the given order.
    pub fn for_functions(functions: &[SelectedFunction]) -> Self {
        let steps = functions
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let parameters = f.parameter_summary();
                ExecutionStep {
                    step_number: i + 1,
                    function_name: f.function_name.clone(),
                    description: format!(
                        "Execute {} with parameters: {parameters}",
                        f.function_name
                    ),
                    parameters,
                    expected_output: f.return_type,
                }
            })
            .collect();
        Self {
            steps,
            estimated_complexity: ComplexityLevel::for_function_count(functions.len()),
            estimated_performance: "Good".to_string(),
        }
    }
}

/// Output of the function-selection stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    pub selected_functions: Vec<SelectedFunction>,
    pub validation_errors: Vec<String>,
    pub validation_passed: bool,
    pub confidence_score: f64,
    pub optimization_score: f64,
    pub execution_plan: ExecutionPlan,
}

impl SelectionResult {
    /// Builds a result; the plan follows the order of `selected_functions`
    /// and validation passes iff there are no errors.
    pub fn new(
        selected_functions: Vec<SelectedFunction>,
        validation_errors: Vec<String>,
        confidence_score: f64,
        optimization_score: f64,
    ) -> Self {
        let execution_plan = ExecutionPlan::for_functions(&selected_functions);
        Self {
            validation_passed: validation_errors.is_empty(),
            selected_functions,
            validation_errors,
            confidence_score: clamp_score(confidence_score),
            optimization_score: clamp_score(optimization_score),
            execution_plan,
        }
    }

    /// Empty result used when selection fails outright.
    pub fn fallback() -> Self {
        Self {
            selected_functions: Vec::new(),
            validation_errors: vec!["Failed to select functions".to_string()],
            validation_passed: false,
            confidence_score: 0.3,
            optimization_score: 0.0,
            execution_plan: ExecutionPlan::for_functions(&[]),
        }
    }

    /// Selected functions by descending priority, ties broken by descending
    /// compatibility. Stable, so equal entries keep their plan order.
    pub fn by_priority(&self) -> Vec<&SelectedFunction> {
        let mut ranked: Vec<&SelectedFunction> = self.selected_functions.iter().collect();
        ranked.sort_by(|a, b| {
            b.priority
                .total_cmp(&a.priority)
                .then(b.compatibility_score.total_cmp(&a.compatibility_score))
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selected(name: &str, priority: f64, compat: f64) -> SelectedFunction {
        SelectedFunction {
            function_name: name.to_string(),
            source_function: name.to_string(),
            syntax: String::new(),
            description: String::new(),
            return_type: ValueType::Number,
            category: FunctionCategory::Math,
            compatibility_score: compat,
            priority,
            examples: Vec::new(),
            parameters: Vec::new(),
            parameter_mappings: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn dependency_description() {
        let dep = FunctionDependency::output_input("ADD", "ROUND");
        assert_eq!(dep.kind, "OUTPUT_INPUT");
        assert_eq!(dep.description, "Output of ADD feeds into ROUND");
    }

    #[test]
    fn plan_describes_each_step() {
        let mut round = selected("ROUND", 0.8, 1.0);
        let param = ParameterDefinition {
            name: "value".into(),
            value_type: ValueType::Number,
            description: String::new(),
            required: true,
        };
        round.parameter_mappings = vec![ParameterMapping::new(
            &param,
            "Amount",
            ValueType::Any,
            BindingSource::FieldReference,
        )];
        let plan = ExecutionPlan::for_functions(&[round, selected("TODAY", 0.5, 1.0)]);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].description, "Execute ROUND with parameters: value=Amount");
        assert_eq!(plan.steps[1].parameters, "none");
        assert_eq!(plan.estimated_complexity, ComplexityLevel::Simple);
        assert_eq!(plan.estimated_performance, "Good");
    }

    #[test]
    fn ranking_breaks_ties_by_compatibility() {
        let result = SelectionResult::new(
            vec![
                selected("A", 0.5, 0.6),
                selected("B", 0.9, 0.7),
                selected("C", 0.5, 0.9),
            ],
            Vec::new(),
            0.8,
            0.8,
        );
        let names: Vec<_> = result
            .by_priority()
            .iter()
            .map(|f| f.function_name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert!(result.validation_passed);
    }

    #[test]
    fn fallback_is_empty_and_failed() {
        let result = SelectionResult::fallback();
        assert!(result.selected_functions.is_empty());
        assert!(!result.validation_passed);
        assert_eq!(result.confidence_score, 0.3);
        assert!(result.execution_plan.steps.is_empty());
    }

    #[test]
    fn fallback_wire_shape() {
        insta::assert_yaml_snapshot!(SelectionResult::fallback(), @r"
        selectedFunctions: []
        validationErrors:
          - Failed to select functions
        validationPassed: false
        confidenceScore: 0.3
        optimizationScore: 0.0
        executionPlan:
          steps: []
          estimatedComplexity: Simple
          estimatedPerformance: Good
        ");
    }
}
