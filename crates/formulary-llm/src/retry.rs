//! Recognising "try again" requests and rebuilding their context.

use crate::error::Result;
use crate::memory::{ConversationMemory, Message, Role};

/// Prefix marking a prompt as a retry of an earlier request.
pub const RETRY_PREFIX: &str = "[RETRY ATTEMPT] Previous attempt failed. ";

/// Messages considered when rebuilding retry context.
pub const DEFAULT_RETRY_WINDOW: usize = 5;

const EXACT_PHRASES: &[&str] = &["try again", "retry", "again"];

const CONTAINED_PHRASES: &[&str] = &[
    "try again",
    "can you try",
    "please try",
    "attempt again",
    "one more time",
];

/// Whether `text` asks to repeat the previous request.
pub fn is_retry_request(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    EXACT_PHRASES.contains(&lower.as_str())
        || CONTAINED_PHRASES.iter().any(|p| lower.contains(p))
}

/// What a retry needs to know about the conversation so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryContext {
    /// The last few messages, oldest first.
    pub recent: Vec<Message>,
    /// The most recent user message that was not itself a retry request.
    pub last_query: Option<String>,
}

/// Reads the retry context of a conversation.
pub fn retry_context(
    memory: &dyn ConversationMemory,
    conversation_id: &str,
    window: usize,
) -> Result<RetryContext> {
    let messages = memory.get(conversation_id)?;
    let last_query = messages
        .iter()
        .rev()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .find(|content| !content.is_empty() && !is_retry_request(content))
        .map(str::to_string);
    let start = messages.len().saturating_sub(window);
    Ok(RetryContext {
        recent: messages[start..].to_vec(),
        last_query,
    })
}

/// Builds the prompt sent for a retry of `previous_query`.
pub fn retry_prompt(previous_query: &str, request: &str) -> String {
    format!(
        "{RETRY_PREFIX}User previously asked and received an unsatisfactory response. \
         Please reconsider the previous question with additional context or a different approach.\n\
         Previous request: {previous_query}\n\
         Current request: {request}"
    )
}
