//! Tag enums shared by every pipeline stage.
//!
//! Each enum has:
//! - Serialize as its canonical upper/camel string
//! - Deserialize and `FromStr` that ignore case and punctuation, plus aliases
//! - `as_str()`, `ALL`, `Display` impl

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Lowercases and drops every non-alphanumeric character, so that
/// `DATE_TIME`, `Date/Time` and `date-time` compare equal.
fn tag_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Macro: a closed enum with a canonical string and optional aliases.
// ---------------------------------------------------------------------------
macro_rules! define_tag {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident,
        variants: [
            $( ($variant:ident, $str:expr $(, $alias:expr)* ) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Returns the canonical string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }

            /// Parses a tag leniently, returning `None` for unknown text.
            pub fn parse_tag(s: &str) -> Option<Self> {
                let key = tag_key(s);
                $(
                    if key == tag_key($str) $( || key == tag_key($alias) )* {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse_tag(s).ok_or_else(|| CoreError::UnknownTag {
                    kind: stringify!($name),
                    value: s.to_owned(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Requirement tags
// ---------------------------------------------------------------------------

define_tag! {
    /// Coarse classification of the function families a requirement needs.
    FunctionCategory, default = Math,
    variants: [
        (Math, "MATH", "mathematical", "arithmetic"),
        (DateTime, "DATE_TIME", "date"),
        (Logical, "LOGICAL", "logic"),
        (Text, "TEXT", "string"),
        (Lookup, "LOOKUP"),
        (Validation, "VALIDATION"),
        (Conversion, "CONVERSION"),
        (Aggregation, "AGGREGATION"),
    ]
}

define_tag! {
    /// The data type a requirement's formula must produce.
    OutputDataType, default = Number,
    variants: [
        (Number, "Number", "numeric", "integer", "double", "decimal"),
        (Text, "Text", "string"),
        (Boolean, "Boolean", "bool", "checkbox"),
        (Date, "Date", "datetime"),
        (Currency, "Currency", "money"),
        (Percent, "Percent", "percentage"),
    ]
}

impl OutputDataType {
    /// Returns `true` for the numeric family (Number, Currency, Percent).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Currency | Self::Percent)
    }
}

define_tag! {
    /// Complexity tier; drives which synthesis strategy is used.
    ComplexityLevel, default = Medium,
    variants: [
        (Simple, "Simple", "low", "basic"),
        (Medium, "Medium", "moderate"),
        (Complex, "Complex", "high", "advanced"),
    ]
}

impl ComplexityLevel {
    /// Complexity tag for an execution plan of `count` functions.
    pub fn for_function_count(count: usize) -> Self {
        match count {
            0..=2 => Self::Simple,
            3..=5 => Self::Medium,
            _ => Self::Complex,
        }
    }
}

define_tag! {
    /// Conditional shapes detected in a requirement.
    ConditionalPattern, default = IfThenElse,
    variants: [
        (IfThenElse, "IF_THEN_ELSE"),
        (NestedIf, "NESTED_IF"),
        (AndOrLogic, "AND_OR_LOGIC"),
        (CaseWhen, "CASE_WHEN"),
        (RangeCheck, "RANGE_CHECK"),
        (NullCheck, "NULL_CHECK"),
    ]
}

// ---------------------------------------------------------------------------
// Catalog value types
// ---------------------------------------------------------------------------

define_tag! {
    /// Declared type of a catalog parameter, return value or bound value.
    ValueType, default = Any,
    variants: [
        (Number, "Number", "numeric", "integer", "int", "double", "decimal"),
        (Text, "Text", "string"),
        (Boolean, "Boolean", "bool", "checkbox"),
        (Date, "Date"),
        (DateTime, "DateTime", "timestamp"),
        (Currency, "Currency"),
        (Percent, "Percent"),
        (Any, "Any", "object", "mixed", "expression"),
    ]
}

impl ValueType {
    fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Currency | Self::Percent)
    }

    fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }

    /// Returns `true` if a value of this type may be passed where `other`
    /// is expected.
    pub fn compatible_with(&self, other: ValueType) -> bool {
        *self == Self::Any
            || other == Self::Any
            || *self == other
            || (self.is_numeric() && other.is_numeric())
            || (self.is_temporal() && other.is_temporal())
    }

    /// Returns `true` if this type is exactly the requested output type.
    pub fn matches_output(&self, output: OutputDataType) -> bool {
        matches!(
            (self, output),
            (Self::Number, OutputDataType::Number)
                | (Self::Text, OutputDataType::Text)
                | (Self::Boolean, OutputDataType::Boolean)
                | (Self::Date, OutputDataType::Date)
                | (Self::Currency, OutputDataType::Currency)
                | (Self::Percent, OutputDataType::Percent)
        )
    }

    /// The literal used when nothing better can be bound to a parameter.
    pub fn default_literal(&self) -> &'static str {
        match self {
            Self::Text => "''",
            Self::Boolean => "false",
            Self::Number | Self::Currency | Self::Percent => "0",
            Self::Date | Self::DateTime => "TODAY()",
            Self::Any => "null",
        }
    }
}

impl From<OutputDataType> for ValueType {
    fn from(output: OutputDataType) -> Self {
        match output {
            OutputDataType::Number => Self::Number,
            OutputDataType::Text => Self::Text,
            OutputDataType::Boolean => Self::Boolean,
            OutputDataType::Date => Self::Date,
            OutputDataType::Currency => Self::Currency,
            OutputDataType::Percent => Self::Percent,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage result tags
// ---------------------------------------------------------------------------

define_tag! {
    /// Where a parameter binding's value came from.
    BindingSource, default = TypeDefault,
    variants: [
        (FieldReference, "FIELD_REFERENCE"),
        (Extracted, "EXTRACTED"),
        (TypeDefault, "TYPE_DEFAULT"),
    ]
}

define_tag! {
    /// Priority of an optimization suggestion.
    SuggestionPriority, default = Medium,
    variants: [
        (High, "HIGH"),
        (Medium, "MEDIUM"),
        (Low, "LOW"),
    ]
}

define_tag! {
    /// Rule that produced an optimization suggestion.
    OptimizationKind, default = ComplexityReduction,
    variants: [
        (NestedFunctions, "NESTED_FUNCTIONS"),
        (StringConcatenation, "STRING_CONCATENATION"),
        (ConditionalLogic, "CONDITIONAL_LOGIC"),
        (ComplexityReduction, "COMPLEXITY_REDUCTION"),
    ]
}

define_tag! {
    /// Coarse result of a simulated formula execution.
    SimulatedOutcome, default = Generic,
    variants: [
        (Conditional, "conditional_result"),
        (Concatenated, "concatenated_result"),
        (Numeric, "numeric_result"),
        (Generic, "generic_result"),
    ]
}

define_tag! {
    /// The fixed edge-case checks run against a primary formula.
    EdgeCase, default = NullValueHandling,
    variants: [
        (NullValueHandling, "NULL_VALUE_HANDLING"),
        (EmptyStringHandling, "EMPTY_STRING_HANDLING"),
        (DivisionByZero, "DIVISION_BY_ZERO"),
        (LargeNumberHandling, "LARGE_NUMBER_HANDLING"),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
