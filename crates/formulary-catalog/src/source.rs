//! Where catalogs come from: the bundled document or a JSON/TOML file.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::{Catalog, CatalogDocument};
use crate::error::{CatalogError, Result};

/// The catalog shipped with the crate.
const BUNDLED: &str = include_str!("../data/functions.json");

/// Parse a catalog document from a JSON string.
pub fn parse_json(content: &str) -> Result<CatalogDocument> {
    serde_json::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))
}

/// Parse a catalog document from a TOML string.
pub fn parse_toml(content: &str) -> Result<CatalogDocument> {
    toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))
}

/// Something a [`Catalog`] can be (re)loaded from.
pub trait CatalogSource: Send + Sync {
    /// Loads a fresh catalog.
    fn load(&self) -> Result<Catalog>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// The bundled catalog document.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCatalog;

impl CatalogSource for EmbeddedCatalog {
    fn load(&self) -> Result<Catalog> {
        Catalog::from_document(parse_json(BUNDLED)?)
    }

    fn describe(&self) -> String {
        "bundled catalog".to_string()
    }
}

/// A catalog file on disk; the format follows the extension.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalog {
    fn load(&self) -> Result<Catalog> {
        debug!(path = %self.path.display(), "loading catalog file");
        let content = std::fs::read_to_string(&self.path)?;
        let document = match self.path.extension().and_then(|e| e.to_str()) {
            Some("json") => parse_json(&content)?,
            Some("toml") => parse_toml(&content)?,
            Some(other) => return Err(CatalogError::UnsupportedFormat(other.to_string())),
            None => parse_json(&content).or_else(|_| parse_toml(&content))?,
        };
        Catalog::from_document(document)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
