//! Completion-service clients for formulary.
//!
//! The pipeline treats the language model as a black box that turns a prompt
//! into text. This crate provides the [`CompletionService`] seam, an
//! OpenAI-compatible HTTP client, an offline stand-in, conversation memory
//! and the retry-detection helpers built on top of it.

pub mod classify;
pub mod error;
pub mod http;
pub mod memory;
pub mod reasoning;
pub mod retry;
pub mod service;

pub use error::{LlmError, Result};
pub use http::{HttpCompletionClient, HttpSettings};
pub use memory::{ConversationMemory, InMemoryConversationMemory, Message, Role};
pub use service::{CompletionService, OfflineCompletion};
