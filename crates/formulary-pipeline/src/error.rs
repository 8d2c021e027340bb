//! Stage error types.

use formulary_catalog::CatalogError;
use formulary_llm::LlmError;

/// Why a stage could not produce its artifact.
///
/// Stage entry points never surface these; they log them and return the
/// artifact's fallback instead.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The completion service failed or returned nothing usable.
    #[error("completion service error: {0}")]
    Completion(#[from] LlmError),

    /// A reply was not in the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Required upstream data is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The catalog could not be read.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// An invariant of the stage itself was broken.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the pipeline crate.
pub type Result<T> = std::result::Result<T, StageError>;
