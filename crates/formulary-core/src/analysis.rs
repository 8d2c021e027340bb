//! [`RequirementAnalysis`]: the structured reading of a user query.

use serde::{Deserialize, Serialize};

use crate::enums::{ComplexityLevel, ConditionalPattern, FunctionCategory, OutputDataType};
use crate::score::clamp_score;

/// Structured requirement extracted from a natural-language query.
///
/// Built once per query through [`RequirementAnalysisBuilder`] and read by
/// every later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementAnalysis {
    pub business_logic: String,
    pub function_categories: Vec<FunctionCategory>,
    pub output_data_type: OutputDataType,
    pub field_references: Vec<String>,
    pub conditional_patterns: Vec<ConditionalPattern>,
    pub math_operations: Vec<String>,
    pub date_time_operations: Vec<String>,
    pub text_operations: Vec<String>,
    pub logical_operations: Vec<String>,
    pub complexity_level: ComplexityLevel,
    pub confidence_score: f64,
}

impl RequirementAnalysis {
    /// Starts a builder for the given business-logic summary.
    pub fn builder(business_logic: impl Into<String>) -> RequirementAnalysisBuilder {
        RequirementAnalysisBuilder::new(business_logic)
    }

    /// Generic analysis used when the completion service cannot be reached.
    pub fn fallback(query: &str) -> Self {
        Self::builder(format!("User requested formula assistance: {query}"))
            .categories([FunctionCategory::Math, FunctionCategory::Logical])
            .output(OutputDataType::Number)
            .math_operations(["CALCULATION"])
            .complexity(ComplexityLevel::Medium)
            .confidence(0.3)
            .build()
    }

    /// All requested operation names across the four per-type lists.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.math_operations
            .iter()
            .chain(&self.date_time_operations)
            .chain(&self.text_operations)
            .chain(&self.logical_operations)
            .map(String::as_str)
    }

    /// Returns `true` if any operation list names `op` (case-insensitive).
    pub fn requests_operation(&self, op: &str) -> bool {
        self.operations().any(|o| o.eq_ignore_ascii_case(op))
    }

    /// Returns `true` if the business logic contains `word` (case-insensitive).
    pub fn mentions(&self, word: &str) -> bool {
        !word.is_empty()
            && self
                .business_logic
                .to_ascii_lowercase()
                .contains(&word.to_ascii_lowercase())
    }

    pub fn has_pattern(&self, pattern: ConditionalPattern) -> bool {
        self.conditional_patterns.contains(&pattern)
    }

    pub fn has_category(&self, category: FunctionCategory) -> bool {
        self.function_categories.contains(&category)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder that normalises lists (trimmed, de-duplicated, operation names
/// upper-cased) and clamps the confidence score.
#[derive(Debug, Clone)]
pub struct RequirementAnalysisBuilder {
    business_logic: String,
    function_categories: Vec<FunctionCategory>,
    output_data_type: OutputDataType,
    field_references: Vec<String>,
    conditional_patterns: Vec<ConditionalPattern>,
    math_operations: Vec<String>,
    date_time_operations: Vec<String>,
    text_operations: Vec<String>,
    logical_operations: Vec<String>,
    complexity_level: ComplexityLevel,
    confidence_score: f64,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn push_operation(list: &mut Vec<String>, op: &str) {
    let op = op.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    if !op.is_empty() {
        push_unique(list, op);
    }
}

impl RequirementAnalysisBuilder {
    pub fn new(business_logic: impl Into<String>) -> Self {
        Self {
            business_logic: business_logic.into().trim().to_string(),
            function_categories: Vec::new(),
            output_data_type: OutputDataType::default(),
            field_references: Vec::new(),
            conditional_patterns: Vec::new(),
            math_operations: Vec::new(),
            date_time_operations: Vec::new(),
            text_operations: Vec::new(),
            logical_operations: Vec::new(),
            complexity_level: ComplexityLevel::default(),
            confidence_score: 0.0,
        }
    }

    pub fn category(mut self, category: FunctionCategory) -> Self {
        push_unique(&mut self.function_categories, category);
        self
    }

    pub fn categories(self, categories: impl IntoIterator<Item = FunctionCategory>) -> Self {
        categories.into_iter().fold(self, Self::category)
    }

    pub fn output(mut self, output: OutputDataType) -> Self {
        self.output_data_type = output;
        self
    }

    pub fn field_reference(mut self, field: impl AsRef<str>) -> Self {
        let field = field.as_ref().trim();
        if !field.is_empty() {
            push_unique(&mut self.field_references, field.to_string());
        }
        self
    }

    pub fn field_references<S: AsRef<str>>(self, fields: impl IntoIterator<Item = S>) -> Self {
        fields.into_iter().fold(self, |b, f| b.field_reference(f))
    }

    pub fn pattern(mut self, pattern: ConditionalPattern) -> Self {
        push_unique(&mut self.conditional_patterns, pattern);
        self
    }

    pub fn patterns(self, patterns: impl IntoIterator<Item = ConditionalPattern>) -> Self {
        patterns.into_iter().fold(self, Self::pattern)
    }

    pub fn math_operations<S: AsRef<str>>(mut self, ops: impl IntoIterator<Item = S>) -> Self {
        for op in ops {
            push_operation(&mut self.math_operations, op.as_ref());
        }
        self
    }

    pub fn date_time_operations<S: AsRef<str>>(mut self, ops: impl IntoIterator<Item = S>) -> Self {
        for op in ops {
            push_operation(&mut self.date_time_operations, op.as_ref());
        }
        self
    }

    pub fn text_operations<S: AsRef<str>>(mut self, ops: impl IntoIterator<Item = S>) -> Self {
        for op in ops {
            push_operation(&mut self.text_operations, op.as_ref());
        }
        self
    }

    pub fn logical_operations<S: AsRef<str>>(mut self, ops: impl IntoIterator<Item = S>) -> Self {
        for op in ops {
            push_operation(&mut self.logical_operations, op.as_ref());
        }
        self
    }

    pub fn complexity(mut self, level: ComplexityLevel) -> Self {
        self.complexity_level = level;
        self
    }

    pub fn confidence(mut self, score: f64) -> Self {
        self.confidence_score = score;
        self
    }

    pub fn build(self) -> RequirementAnalysis {
        RequirementAnalysis {
            business_logic: self.business_logic,
            function_categories: self.function_categories,
            output_data_type: self.output_data_type,
            field_references: self.field_references,
            conditional_patterns: self.conditional_patterns,
            math_operations: self.math_operations,
            date_time_operations: self.date_time_operations,
            text_operations: self.text_operations,
            logical_operations: self.logical_operations,
            complexity_level: self.complexity_level,
            confidence_score: clamp_score(self.confidence_score),
        }
    }
}
