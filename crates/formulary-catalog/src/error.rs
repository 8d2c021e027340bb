//! Catalog error types.

/// Errors that can occur while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog document could not be parsed.
    #[error("catalog parse error: {0}")]
    Parse(String),

    /// The file extension names no supported format.
    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),

    /// The document parsed but is not usable.
    #[error("invalid catalog: {0}")]
    Invalid(String),

    /// Reading the catalog file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the catalog crate.
pub type Result<T> = std::result::Result<T, CatalogError>;
