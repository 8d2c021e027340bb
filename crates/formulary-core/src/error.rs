//! Core error types.

/// Errors raised while building or parsing core artifacts.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A tag string did not name any known variant.
    #[error("unknown {kind} tag: {value}")]
    UnknownTag {
        /// The enum being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// An artifact could not be built from the given input.
    #[error("invalid {artifact}: {message}")]
    InvalidArtifact {
        /// Which artifact was being built.
        artifact: &'static str,
        /// What was wrong with the input.
        message: String,
    },
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Creates a [`CoreError::InvalidArtifact`].
    pub fn invalid(artifact: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            artifact,
            message: message.into(),
        }
    }
}
