//! Catalog entries describing target-system functions.

use serde::{Deserialize, Serialize};

use crate::enums::{FunctionCategory, ValueType};

/// A formal parameter of a catalog function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// One function in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub category: FunctionCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default)]
    pub return_type: ValueType,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub related_functions: Vec<String>,
    /// Implementing class, kept for traceability only.
    #[serde(default, rename = "class")]
    pub class_name: String,
    /// Implementing method, kept for traceability only.
    #[serde(default)]
    pub method: String,
}

impl FunctionDefinition {
    /// One-line signature, e.g. `ROUND(value: Number, decimals: Number) -> Number`.
    pub fn signature(&self, name: &str) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                let optional = if p.required { "" } else { "?" };
                format!("{}{optional}: {}", p.name, p.value_type)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{name}({params}) -> {}", self.return_type)
    }
}
