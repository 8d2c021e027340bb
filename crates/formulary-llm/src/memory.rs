//! Conversation memory: the read/write contract used for retry handling and
//! history replay.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

/// Window used when no explicit size is configured.
pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Storage of conversation transcripts keyed by conversation id.
pub trait ConversationMemory: Send + Sync {
    /// Messages of a conversation, oldest first. Unknown ids yield an empty list.
    fn get(&self, conversation_id: &str) -> Result<Vec<Message>>;

    fn append(&self, conversation_id: &str, message: Message) -> Result<()>;

    fn clear(&self, conversation_id: &str) -> Result<()>;
}

/// Process-local memory keeping the last `max_messages` per conversation.
#[derive(Debug)]
pub struct InMemoryConversationMemory {
    max_messages: usize,
    conversations: Mutex<HashMap<String, VecDeque<Message>>>,
}

impl InMemoryConversationMemory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
            conversations: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, VecDeque<Message>>>> {
        self.conversations
            .lock()
            .map_err(|e| LlmError::Memory(format!("memory lock poisoned: {e}")))
    }
}

impl Default for InMemoryConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl ConversationMemory for InMemoryConversationMemory {
    fn get(&self, conversation_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .lock()?
            .get(conversation_id)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn append(&self, conversation_id: &str, message: Message) -> Result<()> {
        let mut conversations = self.lock()?;
        let messages = conversations.entry(conversation_id.to_string()).or_default();
        messages.push_back(message);
        while messages.len() > self.max_messages {
            messages.pop_front();
        }
        Ok(())
    }

    fn clear(&self, conversation_id: &str) -> Result<()> {
        self.lock()?.remove(conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn keeps_order_per_conversation() {
        let memory = InMemoryConversationMemory::default();
        memory.append("a", Message::user("one")).unwrap();
        memory.append("b", Message::user("other")).unwrap();
        memory.append("a", Message::assistant("two")).unwrap();

        let a = memory.get("a").unwrap();
        assert_eq!(contents(&a), vec!["one", "two"]);
        assert_eq!(a[1].role, Role::Assistant);
        assert_eq!(contents(&memory.get("b").unwrap()), vec!["other"]);
        assert!(memory.get("missing").unwrap().is_empty());
    }

    #[test]
    fn window_drops_oldest() {
        let memory = InMemoryConversationMemory::new(3);
        for i in 0..5 {
            memory.append("s", Message::user(format!("m{i}"))).unwrap();
        }
        assert_eq!(contents(&memory.get("s").unwrap()), vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn clear_forgets_one_conversation() {
        let memory = InMemoryConversationMemory::default();
        memory.append("a", Message::user("x")).unwrap();
        memory.append("b", Message::user("y")).unwrap();
        memory.clear("a").unwrap();
        assert!(memory.get("a").unwrap().is_empty());
        assert_eq!(memory.get("b").unwrap().len(), 1);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(json.contains(r#""role":"user""#));
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
