//! Stage 1: turn a raw query into a [`RequirementAnalysis`].
//!
//! The completion service is asked for a fixed-shape JSON object. Its reply
//! goes through an ordered chain of [`ResponseParser`]s; the last one,
//! [`KeywordHeuristics`], always produces something, at a lowered
//! confidence.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use formulary_catalog::search::{SimilaritySearch, context_block};
use formulary_core::analysis::RequirementAnalysis;
use formulary_core::enums::{ComplexityLevel, ConditionalPattern, FunctionCategory, OutputDataType};
use formulary_llm::CompletionService;

use crate::error::{Result, StageError};

/// Confidence assigned to a heuristic reading of the reply.
pub const HEURISTIC_CONFIDENCE: f64 = 0.6;

/// Confidence assumed when the model omits one.
const DEFAULT_REPLY_CONFIDENCE: f64 = 0.8;

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap());

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9_]+").unwrap());

/// snake_case identifiers such as `close_date`.
static SNAKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z][a-z0-9]*(?:_[a-z0-9]+)+\b").unwrap());

/// Two-word phrases ending in a field-like noun, e.g. "sales amount".
static PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([a-z]+)\s+(amount|date|name|status|total|price|count)\b").unwrap()
});

const PHRASE_STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "its", "their", "his", "her", "this", "that", "each", "any",
    "as", "by", "for", "in", "on", "and", "or", "is", "if", "total", "first", "last",
];

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

const PROMPT_HEAD: &str = "# Query Understanding & Intent Classification Task

You are a CRM formula requirements analyst. Analyze the following user query and extract structured information.

## User Query:
";

const PROMPT_TAIL: &str = r#"## Analysis Requirements:
Extract and classify the following information in JSON format:

```json
{
    "businessLogic": "Clear description of what the user wants to achieve",
    "functionCategories": ["category1", "category2"],
    "outputDataType": "Number|Text|Boolean|Date|Currency|Percent",
    "fieldReferences": ["field1", "field2"],
    "conditionalPatterns": ["pattern1", "pattern2"],
    "mathOperations": ["operation1", "operation2"],
    "dateTimeOperations": ["operation1", "operation2"],
    "textOperations": ["operation1", "operation2"],
    "logicalOperations": ["operation1", "operation2"],
    "complexityLevel": "Simple|Medium|Complex",
    "confidenceScore": 0.85
}
```

## Function Categories (choose relevant ones):
- MATH: Basic arithmetic, calculations, rounding
- DATE_TIME: Date calculations, comparisons, formatting
- LOGICAL: IF statements, AND/OR conditions, comparisons
- TEXT: String manipulation, concatenation, formatting
- LOOKUP: VLOOKUP, reference functions
- VALIDATION: Data validation, error checking
- CONVERSION: Type conversions, formatting
- AGGREGATION: SUM, COUNT, AVERAGE operations

## Output Data Types:
- Number: Numeric calculations, counts, amounts
- Text: String results, formatted text
- Boolean: True/false results, validation checks
- Date: Date calculations, date formatting
- Currency: Money amounts, financial calculations
- Percent: Percentage calculations

## Conditional Patterns (identify if present):
- IF_THEN_ELSE: Basic conditional logic
- NESTED_IF: Multiple condition levels
- AND_OR_LOGIC: Complex boolean conditions
- CASE_WHEN: Switch-like logic
- RANGE_CHECK: Value within range validation
- NULL_CHECK: Handling empty/null values

## Field Reference Patterns:
Look for field names, object references, related record fields

## Instructions:
1. Provide ONLY the JSON response
2. Be specific about function categories needed
3. Identify ALL field references mentioned
4. Set appropriate complexity level
5. Provide confidence score (0.0 to 1.0)

JSON Response:
"#;

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// The JSON object the model is asked for. Every field is optional; a
/// missing or `null` list reads as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnalysisReply {
    business_logic: Option<String>,
    function_categories: Option<Vec<String>>,
    output_data_type: Option<String>,
    field_references: Option<Vec<String>>,
    conditional_patterns: Option<Vec<String>>,
    math_operations: Option<Vec<String>>,
    date_time_operations: Option<Vec<String>>,
    text_operations: Option<Vec<String>>,
    logical_operations: Option<Vec<String>>,
    complexity_level: Option<String>,
    confidence_score: Option<f64>,
}

impl AnalysisReply {
    fn into_analysis(self, query: &str) -> RequirementAnalysis {
        let business_logic = self
            .business_logic
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| query.to_string());

        let mut categories: Vec<FunctionCategory> = Vec::new();
        for raw in self.function_categories.unwrap_or_default() {
            match FunctionCategory::parse_tag(&raw) {
                Some(category) => categories.push(category),
                None => warn!(category = %raw, "dropping unknown function category"),
            }
        }
        if categories.is_empty() {
            categories = Signals::scan(query).categories();
        }

        let output = self
            .output_data_type
            .as_deref()
            .and_then(OutputDataType::parse_tag)
            .unwrap_or(OutputDataType::Number);

        let patterns = self
            .conditional_patterns
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                let parsed = ConditionalPattern::parse_tag(&raw);
                if parsed.is_none() {
                    warn!(pattern = %raw, "dropping unknown conditional pattern");
                }
                parsed
            })
            .collect::<Vec<_>>();

        RequirementAnalysis::builder(business_logic)
            .categories(categories)
            .output(output)
            .field_references(self.field_references.unwrap_or_default())
            .patterns(patterns)
            .math_operations(self.math_operations.unwrap_or_default())
            .date_time_operations(self.date_time_operations.unwrap_or_default())
            .text_operations(self.text_operations.unwrap_or_default())
            .logical_operations(self.logical_operations.unwrap_or_default())
            .complexity(
                self.complexity_level
                    .as_deref()
                    .and_then(ComplexityLevel::parse_tag)
                    .unwrap_or(ComplexityLevel::Medium),
            )
            .confidence(self.confidence_score.unwrap_or(DEFAULT_REPLY_CONFIDENCE))
            .build()
    }
}

fn parse_reply_json(json: &str, query: &str) -> Option<RequirementAnalysis> {
    match serde_json::from_str::<AnalysisReply>(json) {
        Ok(reply) => Some(reply.into_analysis(query)),
        Err(e) => {
            debug!(error = %e, "analysis reply is not valid JSON");
            None
        }
    }
}

/// One strategy for reading the model's reply.
pub trait ResponseParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` when this strategy does not recognise the reply.
    fn parse(&self, query: &str, reply: &str) -> Option<RequirementAnalysis>;
}

/// A fenced ```` ```json ```` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct FencedJson;

impl ResponseParser for FencedJson {
    fn name(&self) -> &'static str {
        "fenced-json"
    }

    fn parse(&self, query: &str, reply: &str) -> Option<RequirementAnalysis> {
        let cap = FENCED_RE.captures(reply)?;
        parse_reply_json(&cap[1], query)
    }
}

/// Everything from the first `{` to the last `}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceJson;

impl ResponseParser for BraceJson {
    fn name(&self) -> &'static str {
        "brace-json"
    }

    fn parse(&self, query: &str, reply: &str) -> Option<RequirementAnalysis> {
        let start = reply.find('{')?;
        let end = reply.rfind('}')?;
        if end <= start {
            return None;
        }
        parse_reply_json(&reply[start..=end], query)
    }
}

/// Keyword scan of the query and the reply. Never declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordHeuristics;

impl ResponseParser for KeywordHeuristics {
    fn name(&self) -> &'static str {
        "keyword-heuristics"
    }

    fn parse(&self, query: &str, reply: &str) -> Option<RequirementAnalysis> {
        let signals = Signals::scan(&format!("{query}\n{reply}"));
        Some(
            RequirementAnalysis::builder(query)
                .categories(signals.categories())
                .output(signals.output())
                .field_references(field_references(query))
                .patterns(signals.patterns())
                .math_operations(signals.math_operations())
                .complexity(ComplexityLevel::Medium)
                .confidence(HEURISTIC_CONFIDENCE)
                .build(),
        )
    }
}

/// The parse chain, tried in order.
pub static DEFAULT_PARSERS: [&dyn ResponseParser; 3] = [&FencedJson, &BraceJson, &KeywordHeuristics];

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Lower-cased words of a text, plus whether it contains a `%` sign.
struct Signals {
    words: BTreeSet<String>,
    percent_sign: bool,
}

impl Signals {
    fn scan(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        Self {
            words: WORD_RE
                .find_iter(&lower)
                .map(|m| m.as_str().to_string())
                .collect(),
            percent_sign: lower.contains('%'),
        }
    }

    fn any(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.words.contains(*w))
    }

    fn percentage(&self) -> bool {
        self.percent_sign || self.any(&["percent", "percentage"])
    }

    fn categories(&self) -> Vec<FunctionCategory> {
        let mut found = Vec::new();
        if self.percentage() || self.any(&["math", "calculate", "sum", "total"]) {
            found.push(FunctionCategory::Math);
        }
        if self.any(&["date", "time", "day", "days", "month", "months", "year", "years"]) {
            found.push(FunctionCategory::DateTime);
        }
        if self.any(&["if", "condition", "otherwise", "when"]) {
            found.push(FunctionCategory::Logical);
        }
        if self.any(&["text", "string", "concatenate", "name"]) {
            found.push(FunctionCategory::Text);
        }
        if found.is_empty() {
            found.push(FunctionCategory::Math);
        }
        found
    }

    fn output(&self) -> OutputDataType {
        if self.any(&["number", "calculate"]) {
            OutputDataType::Number
        } else if self.any(&["text", "string"]) {
            OutputDataType::Text
        } else if self.any(&["true", "false", "boolean"]) {
            OutputDataType::Boolean
        } else if self.any(&["date"]) {
            OutputDataType::Date
        } else if self.any(&["currency", "money"]) {
            OutputDataType::Currency
        } else if self.percentage() {
            OutputDataType::Percent
        } else {
            OutputDataType::Number
        }
    }

    fn patterns(&self) -> Vec<ConditionalPattern> {
        let mut found = Vec::new();
        if self.any(&["if"]) {
            found.push(ConditionalPattern::IfThenElse);
        }
        if self.any(&["and", "or"]) && self.any(&["if", "when", "condition"]) {
            found.push(ConditionalPattern::AndOrLogic);
        }
        if self.any(&["case", "switch"]) {
            found.push(ConditionalPattern::CaseWhen);
        }
        if self.any(&["between", "range"]) {
            found.push(ConditionalPattern::RangeCheck);
        }
        if self.any(&["null", "empty", "blank"]) {
            found.push(ConditionalPattern::NullCheck);
        }
        found
    }

    fn math_operations(&self) -> Vec<&'static str> {
        let mut ops = Vec::new();
        if self.percentage() {
            ops.push("PERCENTAGE");
        }
        let table: [(&[&str], &str); 5] = [
            (&["add", "plus", "sum"], "ADD"),
            (&["subtract", "minus", "difference"], "SUBTRACT"),
            (&["multiply", "times", "product"], "MULTIPLY"),
            (&["divide", "ratio", "per"], "DIVIDE"),
            (&["round", "rounded"], "ROUND"),
        ];
        for (words, op) in table {
            if self.any(words) {
                ops.push(op);
            }
        }
        ops
    }
}

/// Field names spelled in snake_case or as "<word> amount"-style phrases.
fn field_references(query: &str) -> Vec<String> {
    let lower = query.to_ascii_lowercase();
    let mut fields: Vec<String> = SNAKE_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect();
    for cap in PHRASE_RE.captures_iter(&lower) {
        if PHRASE_STOPWORDS.contains(&&cap[1]) {
            continue;
        }
        let field = format!("{}_{}", &cap[1], &cap[2]);
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    fields
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Stage 1 of the pipeline.
pub struct RequirementAnalyzer {
    service: Arc<dyn CompletionService>,
    search: Option<Arc<dyn SimilaritySearch>>,
    snippets: usize,
}

impl RequirementAnalyzer {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            search: None,
            snippets: 0,
        }
    }

    /// Adds up to `snippets` documentation snippets to every prompt.
    pub fn with_search(mut self, search: Arc<dyn SimilaritySearch>, snippets: usize) -> Self {
        self.search = Some(search);
        self.snippets = snippets;
        self
    }

    /// The analysis prompt for `query`.
    pub fn prompt(&self, query: &str) -> String {
        let mut prompt = format!("{PROMPT_HEAD}{query}\n\n");
        if let Some(search) = &self.search {
            let snippets = search.search(query, self.snippets);
            if !snippets.is_empty() {
                prompt.push_str("## Reference Documentation:\n");
                prompt.push_str(&context_block(&snippets));
                prompt.push_str("\n\n");
            }
        }
        prompt.push_str(PROMPT_TAIL);
        prompt
    }

    /// Reads a reply through [`DEFAULT_PARSERS`].
    pub fn parse_reply(&self, query: &str, reply: &str) -> Result<RequirementAnalysis> {
        for parser in DEFAULT_PARSERS {
            if let Some(analysis) = parser.parse(query, reply) {
                debug!(parser = parser.name(), "analysis reply parsed");
                return Ok(analysis);
            }
        }
        Err(StageError::Parse("no parser accepted the reply".into()))
    }

    pub fn try_analyze(&self, query: &str, session: Option<&str>) -> Result<RequirementAnalysis> {
        if query.trim().is_empty() {
            return Err(StageError::Validation("query is empty".into()));
        }
        let reply = self.service.complete(&self.prompt(query), session)?;
        debug!(reply_len = reply.len(), "analysis reply received");
        self.parse_reply(query, &reply)
    }

    /// Analyzes `query`; on failure returns [`RequirementAnalysis::fallback`].
    pub fn analyze(&self, query: &str, session: Option<&str>) -> RequirementAnalysis {
        match self.try_analyze(query, session) {
            Ok(analysis) => {
                info!(
                    stage = "analyze",
                    categories = ?analysis.function_categories,
                    output = %analysis.output_data_type,
                    fields = analysis.field_references.len(),
                    score = analysis.confidence_score,
                    "analysis complete"
                );
                analysis
            }
            Err(e) => {
                warn!(stage = "analyze", session = session.unwrap_or("-"), error = %e, "analysis failed, using fallback");
                RequirementAnalysis::fallback(query)
            }
        }
    }
}

impl std::fmt::Debug for RequirementAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementAnalyzer")
            .field("search", &self.search.is_some())
            .field("snippets", &self.snippets)
            .finish()
    }
}
