//! Fixed compatibility table from source-system functions to target-system
//! equivalents.
//!
//! Each [`FunctionCategory`] maps to one generator. Most categories are a
//! static list of rows; a few rows only apply when the requirement asks for
//! them (percentages, nested conditions, multi-way branches).

use formulary_core::analysis::RequirementAnalysis;
use formulary_core::enums::{ConditionalPattern, FunctionCategory};
use formulary_core::mapping::{AvailableFunction, MissingFunction};

/// One row of the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompatRow {
    pub source: &'static str,
    pub target: &'static str,
    pub syntax: &'static str,
    pub description: &'static str,
    pub score: f64,
    pub limitation: Option<&'static str>,
}

const fn full(
    source: &'static str,
    target: &'static str,
    syntax: &'static str,
    description: &'static str,
    score: f64,
) -> CompatRow {
    CompatRow {
        source,
        target,
        syntax,
        description,
        score,
        limitation: None,
    }
}

const fn partial(
    source: &'static str,
    target: &'static str,
    syntax: &'static str,
    description: &'static str,
    score: f64,
    limitation: &'static str,
) -> CompatRow {
    CompatRow {
        source,
        target,
        syntax,
        description,
        score,
        limitation: Some(limitation),
    }
}

impl CompatRow {
    pub fn to_available(&self) -> AvailableFunction {
        AvailableFunction::new(
            self.source,
            self.target,
            self.syntax,
            self.description,
            self.score,
            self.limitation.map(str::to_string),
        )
    }
}

/// Functions a category generator produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMapping {
    pub available: Vec<AvailableFunction>,
    pub missing: Vec<MissingFunction>,
}

/// A category-specific generator.
pub type Generator = fn(&RequirementAnalysis) -> CategoryMapping;

/// The generator responsible for `category`.
pub fn generator(category: FunctionCategory) -> Generator {
    match category {
        FunctionCategory::Math => math,
        FunctionCategory::DateTime => date_time,
        FunctionCategory::Logical => logical,
        FunctionCategory::Text => text,
        FunctionCategory::Lookup => lookup,
        FunctionCategory::Validation => validation,
        FunctionCategory::Conversion => conversion,
        FunctionCategory::Aggregation => aggregation,
    }
}

/// Runs the generator for `category` against `analysis`.
pub fn map_category(category: FunctionCategory, analysis: &RequirementAnalysis) -> CategoryMapping {
    generator(category)(analysis)
}

/// Alternative offered for an operation with no equivalent.
pub fn suggested_alternative(operation: &str) -> &'static str {
    match operation.to_ascii_uppercase().as_str() {
        "POWER" | "POW" => "Use repeated multiplication: value * value",
        "LOG" | "LN" => "Use custom calculation or external function",
        "REGEX" => "Use LIKE patterns or substring functions",
        "SQRT" => "Use a precomputed field or external function",
        "MOD" => "Use value - FLOOR(value / divisor) * divisor",
        _ => "Consider custom implementation or breaking down into simpler operations",
    }
}

/// Reason recorded for an operation with no equivalent.
pub const NOT_SUPPORTED: &str = "Not directly supported";

fn rows(rows: &[CompatRow]) -> Vec<AvailableFunction> {
    rows.iter().map(CompatRow::to_available).collect()
}

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

const PERCENTAGE: CompatRow = full(
    "PERCENTAGE",
    "MULTIPLY",
    "value * 0.01",
    "Percentage as multiplication by a fraction",
    1.0,
);

const MATH: &[CompatRow] = &[
    full("ADD", "ADD", "value1 + value2", "Addition", 1.0),
    full("SUBTRACT", "SUBTRACT", "value1 - value2", "Subtraction", 1.0),
    full("MULTIPLY", "MULTIPLY", "value1 * value2", "Multiplication", 1.0),
    full("DIVIDE", "DIVIDE", "value1 / value2", "Division", 1.0),
    full("ROUND", "ROUND", "ROUND(value, decimals)", "Round to decimal places", 1.0),
    full("ABS", "ABS", "ABS(value)", "Absolute value", 1.0),
    full("CEILING", "CEIL", "CEIL(value)", "Round up", 1.0),
    full("FLOOR", "FLOOR", "FLOOR(value)", "Round down", 1.0),
];

fn math(analysis: &RequirementAnalysis) -> CategoryMapping {
    let mut available = Vec::new();
    if analysis.requests_operation("PERCENTAGE") {
        available.push(PERCENTAGE.to_available());
    }
    available.extend(rows(MATH));
    CategoryMapping {
        available,
        missing: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Date/time
// ---------------------------------------------------------------------------

const DATE_TIME: &[CompatRow] = &[
    full("TODAY", "CURRENT_DATE", "CURRENT_DATE()", "Current date", 1.0),
    full("NOW", "CURRENT_TIMESTAMP", "CURRENT_TIMESTAMP()", "Current date and time", 1.0),
    full("YEAR", "EXTRACT_YEAR", "EXTRACT_YEAR(date)", "Year of a date", 1.0),
    full("MONTH", "EXTRACT_MONTH", "EXTRACT_MONTH(date)", "Month of a date", 1.0),
    full("DAY", "EXTRACT_DAY", "EXTRACT_DAY(date)", "Day of a date", 1.0),
    full("ADDMONTHS", "DATE_ADD_MONTHS", "DATE_ADD_MONTHS(date, months)", "Add months to a date", 0.9),
    full("DATEVALUE", "PARSE_DATE", "PARSE_DATE(text)", "Parse text as a date", 0.8),
    partial(
        "WEEKDAY",
        "DAYOFWEEK",
        "DAYOFWEEK(date)",
        "Day of the week",
        0.7,
        "Different numbering system",
    ),
];

fn date_time(_analysis: &RequirementAnalysis) -> CategoryMapping {
    CategoryMapping {
        available: rows(DATE_TIME),
        missing: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Logical
// ---------------------------------------------------------------------------

const LOGICAL: &[CompatRow] = &[
    full("IF", "IF", "IF(condition, true_value, false_value)", "Conditional value", 1.0),
    full("AND", "AND", "AND(condition1, condition2)", "Logical conjunction", 1.0),
    full("OR", "OR", "OR(condition1, condition2)", "Logical disjunction", 1.0),
    full("NOT", "NOT", "NOT(condition)", "Logical negation", 1.0),
    full("ISNULL", "IS_NULL", "IS_NULL(field)", "Null check", 1.0),
    full("ISBLANK", "IS_EMPTY", "IS_EMPTY(field)", "Null or empty check", 0.9),
];

const NESTED_IF: CompatRow = full(
    "NESTED_IF",
    "CASE_WHEN",
    "CASE_WHEN(condition1, value1, condition2, value2, else_value)",
    "Chained conditions as a multi-way branch",
    0.9,
);

const CASE: CompatRow = full(
    "CASE",
    "CASE_WHEN",
    "CASE_WHEN(expression, value1, result1, else_result)",
    "Multi-way branch",
    1.0,
);

fn logical(analysis: &RequirementAnalysis) -> CategoryMapping {
    let mut available = rows(LOGICAL);
    if analysis.has_pattern(ConditionalPattern::NestedIf) {
        available.push(NESTED_IF.to_available());
    }
    if analysis.has_pattern(ConditionalPattern::CaseWhen) {
        available.push(CASE.to_available());
    }
    CategoryMapping {
        available,
        missing: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

const TEXT: &[CompatRow] = &[
    full("CONCATENATE", "CONCAT", "CONCAT(text1, text2)", "Join text values", 1.0),
    full("LEN", "LENGTH", "LENGTH(text)", "Text length", 1.0),
    full("LEFT", "LEFT", "LEFT(text, num_chars)", "Leftmost characters", 1.0),
    full("RIGHT", "RIGHT", "RIGHT(text, num_chars)", "Rightmost characters", 1.0),
    full("MID", "SUBSTRING", "SUBSTRING(text, start, length)", "Substring", 1.0),
    full("UPPER", "UPPER", "UPPER(text)", "Upper case", 1.0),
    full("LOWER", "LOWER", "LOWER(text)", "Lower case", 1.0),
    full("TRIM", "TRIM", "TRIM(text)", "Strip surrounding spaces", 1.0),
    full("FIND", "LOCATE", "LOCATE(search_text, text)", "Position of a substring", 0.9),
    full("SUBSTITUTE", "REPLACE", "REPLACE(text, old_text, new_text)", "Replace text", 1.0),
];

fn text(_analysis: &RequirementAnalysis) -> CategoryMapping {
    CategoryMapping {
        available: rows(TEXT),
        missing: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

const LOOKUP: &[CompatRow] = &[
    partial(
        "VLOOKUP",
        "JOIN_LOOKUP",
        "JOIN_LOOKUP(table, key, field)",
        "Lookup through a join",
        0.6,
        "Requires JOIN syntax",
    ),
    partial(
        "LOOKUP",
        "SUBQUERY",
        "SUBQUERY(lookup_value, result_field)",
        "Lookup through a subquery",
        0.7,
        "Requires subquery",
    ),
];

fn lookup(_analysis: &RequirementAnalysis) -> CategoryMapping {
    CategoryMapping {
        available: rows(LOOKUP),
        missing: vec![
            MissingFunction::new(
                "HLOOKUP",
                "No direct equivalent",
                "Horizontal lookup not supported",
            ),
            MissingFunction::new(
                "INDEX",
                "Array access syntax needed",
                "Index-based lookup requires custom logic",
            ),
        ],
    }
}

// ---------------------------------------------------------------------------
// Validation, conversion, aggregation
// ---------------------------------------------------------------------------

const VALIDATION: &[CompatRow] = &[
    full("ISNUMBER", "IS_NUMERIC", "IS_NUMERIC(text)", "Numeric check", 0.8),
    full("ISTEXT", "IS_TEXT", "IS_TEXT(value)", "Text check", 0.7),
    partial(
        "ISERROR",
        "TRY_CATCH",
        "TRY_CATCH(expression)",
        "Error check",
        0.5,
        "Requires procedural logic",
    ),
];

fn validation(_analysis: &RequirementAnalysis) -> CategoryMapping {
    CategoryMapping {
        available: rows(VALIDATION),
        missing: Vec::new(),
    }
}

const CONVERSION: &[CompatRow] = &[
    full("VALUE", "CAST_NUMERIC", "CAST_NUMERIC(text)", "Text to number", 0.9),
    full("TEXT", "CAST_TEXT", "CAST_TEXT(value)", "Value to text", 0.9),
    full("CURRENCY", "FORMAT_CURRENCY", "FORMAT_CURRENCY(number)", "Currency formatting", 0.8),
    partial(
        "PERCENT",
        "FORMAT_PERCENT",
        "FORMAT_PERCENT(number)",
        "Percentage formatting",
        0.7,
        "Manual percentage formatting",
    ),
];

fn conversion(_analysis: &RequirementAnalysis) -> CategoryMapping {
    CategoryMapping {
        available: rows(CONVERSION),
        missing: Vec::new(),
    }
}

const AGGREGATION: &[CompatRow] = &[
    full("SUM", "SUM", "SUM(value1, value2)", "Sum", 1.0),
    full("COUNT", "COUNT", "COUNT(field)", "Count", 1.0),
    full("AVERAGE", "AVG", "AVG(value1, value2)", "Average", 1.0),
    full("MIN", "MIN", "MIN(value1, value2)", "Minimum", 1.0),
    full("MAX", "MAX", "MAX(value1, value2)", "Maximum", 1.0),
    partial(
        "MEDIAN",
        "MEDIAN_CALC",
        "MEDIAN_CALC(values)",
        "Median",
        0.6,
        "No built-in MEDIAN function",
    ),
];

fn aggregation(_analysis: &RequirementAnalysis) -> CategoryMapping {
    CategoryMapping {
        available: rows(AGGREGATION),
        missing: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sources(mapping: &CategoryMapping) -> Vec<&str> {
        mapping
            .available
            .iter()
            .map(|f| f.source_function.as_str())
            .collect()
    }

    #[test]
    fn percentage_only_when_requested() {
        let plain = RequirementAnalysis::builder("add two numbers").build();
        assert!(!sources(&map_category(FunctionCategory::Math, &plain)).contains(&"PERCENTAGE"));

        let pct = RequirementAnalysis::builder("5% of amount")
            .math_operations(["PERCENTAGE"])
            .build();
        let mapping = map_category(FunctionCategory::Math, &pct);
        assert_eq!(sources(&mapping)[0], "PERCENTAGE");
        assert_eq!(mapping.available[0].target_function, "MULTIPLY");
    }

    #[test]
    fn multi_way_rows_follow_patterns() {
        let analysis = RequirementAnalysis::builder("tiers")
            .patterns([ConditionalPattern::NestedIf, ConditionalPattern::CaseWhen])
            .build();
        let mapping = map_category(FunctionCategory::Logical, &analysis);
        let names = sources(&mapping);
        assert!(names.contains(&"NESTED_IF"));
        assert!(names.contains(&"CASE"));

        let plain = RequirementAnalysis::builder("if").build();
        assert_eq!(map_category(FunctionCategory::Logical, &plain).available.len(), 6);
    }

    #[test]
    fn lookup_reports_missing_functions() {
        let mapping = map_category(FunctionCategory::Lookup, &RequirementAnalysis::builder("x").build());
        assert_eq!(mapping.missing.len(), 2);
        assert_eq!(mapping.missing[0].source_function, "HLOOKUP");
        assert!(mapping.available.iter().all(|f| !f.fully_supported));
        assert_eq!(
            mapping.available[0].limitations.as_deref(),
            Some("Requires JOIN syntax")
        );
    }

    #[test]
    fn every_category_has_rows() {
        let analysis = RequirementAnalysis::builder("x").build();
        for category in FunctionCategory::ALL {
            assert!(
                !map_category(*category, &analysis).available.is_empty(),
                "{category} produced nothing"
            );
        }
    }

    #[test]
    fn alternatives_table() {
        assert_eq!(suggested_alternative("power"), "Use repeated multiplication: value * value");
        assert_eq!(suggested_alternative("LOG"), "Use custom calculation or external function");
        assert_eq!(suggested_alternative("REGEX"), "Use LIKE patterns or substring functions");
        assert_eq!(
            suggested_alternative("DATEDIFF"),
            "Consider custom implementation or breaking down into simpler operations"
        );
    }

    #[test]
    fn partial_rows_are_never_fully_supported() {
        let analysis = RequirementAnalysis::builder("x").build();
        for category in FunctionCategory::ALL {
            for f in map_category(*category, &analysis).available {
                if f.limitations.is_some() {
                    assert!(!f.fully_supported, "{} should be partial", f.source_function);
                }
            }
        }
    }
}
