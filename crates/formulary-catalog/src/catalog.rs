//! The catalog document and its read-only query API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use formulary_core::definition::FunctionDefinition;
use formulary_core::enums::{FunctionCategory, ValueType};

use crate::error::{CatalogError, Result};

/// Name of the target system when the document does not say.
const DEFAULT_SYSTEM: &str = "CRM Formula Engine";

/// A category section of the catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub common_use_cases: Vec<String>,
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    #[serde(default)]
    pub total_functions: usize,
    #[serde(default)]
    pub categories_count: usize,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_system")]
    pub system: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_system() -> String {
    DEFAULT_SYSTEM.to_string()
}

impl Default for CatalogMetadata {
    fn default() -> Self {
        Self {
            total_functions: 0,
            categories_count: 0,
            version: default_version(),
            system: default_system(),
        }
    }
}

/// The serialized shape of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDefinition>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryDefinition>,
    #[serde(default)]
    pub common_patterns: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: CatalogMetadata,
}

/// Summary counts for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_functions: usize,
    pub by_category: BTreeMap<FunctionCategory, usize>,
    pub patterns: usize,
    pub version: String,
    pub system: String,
}

/// An immutable, indexed catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    document: CatalogDocument,
    /// Upper-cased name -> key in `document.functions`.
    index: BTreeMap<String, String>,
}

impl Catalog {
    /// Indexes a parsed document. Names that collide case-insensitively are
    /// rejected.
    pub fn from_document(document: CatalogDocument) -> Result<Self> {
        let mut index = BTreeMap::new();
        for name in document.functions.keys() {
            let key = name.to_ascii_uppercase();
            if let Some(previous) = index.insert(key, name.clone()) {
                return Err(CatalogError::Invalid(format!(
                    "function {name} collides with {previous}"
                )));
            }
        }
        Ok(Self { document, index })
    }

    /// A catalog with no functions.
    pub fn empty() -> Self {
        Self {
            document: CatalogDocument::default(),
            index: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.document.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.functions.is_empty()
    }

    pub fn document(&self) -> &CatalogDocument {
        &self.document
    }

    pub fn metadata(&self) -> &CatalogMetadata {
        &self.document.metadata
    }

    // -- Lookups -------------------------------------------------------------

    /// Looks up a function by name, ignoring case, returning the catalog's
    /// own spelling of the name alongside the definition.
    pub fn entry(&self, name: &str) -> Option<(&str, &FunctionDefinition)> {
        let key = self.index.get(&name.trim().to_ascii_uppercase())?;
        self.document
            .functions
            .get_key_value(key)
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a function definition by name, ignoring case.
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.entry(name).map(|(_, def)| def)
    }

    /// Every function, ordered by name.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionDefinition)> {
        self.document
            .functions
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn by_category(&self, category: FunctionCategory) -> Vec<(&str, &FunctionDefinition)> {
        self.functions()
            .filter(|(_, def)| def.category == category)
            .collect()
    }

    pub fn by_return_type(&self, return_type: ValueType) -> Vec<(&str, &FunctionDefinition)> {
        self.functions()
            .filter(|(_, def)| def.return_type == return_type)
            .collect()
    }

    /// Functions whose description, use cases or examples contain `text`
    /// (case-insensitive).
    pub fn search(&self, text: &str) -> Vec<(&str, &FunctionDefinition)> {
        let needle = text.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let hit = |s: &String| s.to_ascii_lowercase().contains(&needle);
        self.functions()
            .filter(|(_, def)| {
                hit(&def.description) || def.use_cases.iter().any(hit) || def.examples.iter().any(hit)
            })
            .collect()
    }

    /// Category sections for the given tags, matched leniently against the
    /// document's category names.
    pub fn category_definitions(
        &self,
        categories: &[FunctionCategory],
    ) -> Vec<(&str, &CategoryDefinition)> {
        self.document
            .categories
            .iter()
            .filter(|(name, _)| {
                FunctionCategory::parse_tag(name).is_some_and(|c| categories.contains(&c))
            })
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    /// Definitions for the given names; unknown names are skipped.
    pub fn definitions<'a>(
        &'a self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<(&'a str, &'a FunctionDefinition)> {
        names.into_iter().filter_map(|n| self.entry(n)).collect()
    }

    pub fn patterns(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.document.common_patterns
    }

    pub fn stats(&self) -> CatalogStats {
        let mut by_category = BTreeMap::new();
        for (_, def) in self.functions() {
            *by_category.entry(def.category).or_insert(0) += 1;
        }
        CatalogStats {
            total_functions: self.len(),
            by_category,
            patterns: self.document.common_patterns.len(),
            version: self.document.metadata.version.clone(),
            system: self.document.metadata.system.clone(),
        }
    }
}
