//! The [`CompletionService`] seam and the offline stand-in.

use std::sync::Arc;

use crate::error::{LlmError, Result};

/// A language-model completion service.
///
/// Implementations turn a prompt into free text, which may contain a JSON
/// payload. `conversation_id` lets stateful implementations replay and extend
/// a conversation; stateless ones ignore it.
pub trait CompletionService: Send + Sync {
    fn complete(&self, prompt: &str, conversation_id: Option<&str>) -> Result<String>;
}

impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    fn complete(&self, prompt: &str, conversation_id: Option<&str>) -> Result<String> {
        (**self).complete(prompt, conversation_id)
    }
}

impl<T: CompletionService + ?Sized> CompletionService for Box<T> {
    fn complete(&self, prompt: &str, conversation_id: Option<&str>) -> Result<String> {
        (**self).complete(prompt, conversation_id)
    }
}

/// A service that is never reachable.
///
/// Every call fails with [`LlmError::Unavailable`], so each pipeline stage
/// takes its fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCompletion;

impl CompletionService for OfflineCompletion {
    fn complete(&self, _prompt: &str, _conversation_id: Option<&str>) -> Result<String> {
        Err(LlmError::Unavailable(
            "offline provider configured".to_string(),
        ))
    }
}
