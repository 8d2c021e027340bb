//! OpenAI-compatible chat-completions client over ureq.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::memory::{ConversationMemory, Message, Role};
use crate::reasoning::strip_reasoning;
use crate::service::CompletionService;

/// Connection and sampling settings for [`HttpCompletionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    /// Bearer token; omitted from requests when `None`.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Whole-request timeout. `None` leaves it to the server.
    pub timeout: Option<Duration>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 1024,
            timeout: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Replayed history followed by the new user prompt.
fn build_messages(history: &[Message], prompt: &str) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|m| ChatMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        })
        .chain(std::iter::once(ChatMessage {
            role: Role::User.as_str(),
            content: prompt.to_string(),
        }))
        .collect()
}

fn extract_content(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(LlmError::EmptyResponse)?;
    let content = strip_reasoning(&content);
    if content.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking client for `POST {base_url}/chat/completions`.
///
/// With memory attached, calls that carry a conversation id replay that
/// conversation and append the new exchange once a reply arrives.
pub struct HttpCompletionClient {
    agent: ureq::Agent,
    settings: HttpSettings,
    memory: Option<Arc<dyn ConversationMemory>>,
}

impl HttpCompletionClient {
    pub fn new(settings: HttpSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(settings.timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            settings,
            memory: None,
        }
    }

    /// Attaches conversation memory for history replay.
    pub fn with_memory(mut self, memory: Arc<dyn ConversationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn history(&self, conversation_id: Option<&str>) -> Vec<Message> {
        let (Some(memory), Some(id)) = (&self.memory, conversation_id) else {
            return Vec::new();
        };
        memory.get(id).unwrap_or_else(|e| {
            warn!(session = id, error = %e, "could not read conversation history");
            Vec::new()
        })
    }

    fn remember(&self, conversation_id: Option<&str>, prompt: &str, reply: &str) {
        let (Some(memory), Some(id)) = (&self.memory, conversation_id) else {
            return;
        };
        for message in [Message::user(prompt), Message::assistant(reply)] {
            if let Err(e) = memory.append(id, message) {
                warn!(session = id, error = %e, "could not record conversation");
                return;
            }
        }
    }

    fn post(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let mut request = self.agent.post(&self.endpoint());
        if let Some(key) = &self.settings.api_key {
            request = request.header("Authorization", &format!("Bearer {key}"));
        }
        let mut response = request.send_json(&body)?;
        response
            .body_mut()
            .read_json::<ChatResponse>()
            .map_err(|e| LlmError::Decode(e.to_string()))
    }
}

impl CompletionService for HttpCompletionClient {
    fn complete(&self, prompt: &str, conversation_id: Option<&str>) -> Result<String> {
        let history = self.history(conversation_id);
        debug!(
            model = %self.settings.model,
            history = history.len(),
            prompt_len = prompt.len(),
            "requesting completion"
        );
        let reply = extract_content(self.post(build_messages(&history, prompt))?)?;
        self.remember(conversation_id, prompt, &reply);
        Ok(reply)
    }
}

impl std::fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("endpoint", &self.endpoint())
            .field("model", &self.settings.model)
            .field("memory", &self.memory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryConversationMemory;
    use pretty_assertions::assert_eq;

    fn response(json: &str) -> ChatResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = HttpCompletionClient::new(HttpSettings {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..HttpSettings::default()
        });
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn history_is_replayed_before_prompt() {
        let history = vec![Message::user("Sum two fields"), Message::assistant("ADD(a, b)")];
        let messages = build_messages(&history, "try again");
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(messages[2].content, "try again");
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "m",
            messages: build_messages(&[], "hi"),
            temperature: 0.5,
            max_tokens: 10,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 10);
    }

    #[test]
    fn extracts_first_choice_without_reasoning() {
        let r = response(
            r#"{"choices": [{"message": {"role": "assistant", "content": "<think>x</think>IF(a, b, c)"}}]}"#,
        );
        assert_eq!(extract_content(r).unwrap(), "IF(a, b, c)");
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        assert!(matches!(
            extract_content(response(r#"{"choices": []}"#)),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            extract_content(response(r#"{"choices": [{"message": {"content": "<think>only</think>"}}]}"#)),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn remembers_exchange_for_conversation() {
        let memory = Arc::new(InMemoryConversationMemory::default());
        let client = HttpCompletionClient::new(HttpSettings::default()).with_memory(memory.clone());

        client.remember(Some("s"), "question", "answer");
        client.remember(None, "ignored", "ignored");

        let stored = memory.get("s").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].role, Role::Assistant);
        assert_eq!(client.history(Some("s")).len(), 2);
        assert!(client.history(None).is_empty());
    }
}
