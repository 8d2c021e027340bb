//! Completion-service errors.

/// Errors raised while talking to a completion service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No completion service is configured.
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    /// The request never produced a response (connect, TLS, timeout).
    #[error("http error: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("completion service returned status {code}")]
    Status {
        /// HTTP status code.
        code: u16,
    },

    /// The response body was not the expected shape.
    #[error("failed to decode completion response: {0}")]
    Decode(String),

    /// The response carried no text.
    #[error("completion response was empty")]
    EmptyResponse,

    /// Conversation memory could not be read or written.
    #[error("conversation memory error: {0}")]
    Memory(String),
}

/// Convenience alias used throughout the llm crate.
pub type Result<T> = std::result::Result<T, LlmError>;

impl From<ureq::Error> for LlmError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => Self::Status { code },
            other => Self::Http(other.to_string()),
        }
    }
}
