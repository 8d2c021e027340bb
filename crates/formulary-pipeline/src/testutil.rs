//! Scripted completion service shared by the stage tests.

use std::sync::Mutex;

use formulary_llm::{CompletionService, LlmError};

type Responder = Box<dyn Fn(&str) -> formulary_llm::Result<String> + Send + Sync>;

/// Answers each prompt with a closure and records every prompt it saw.
pub(crate) struct Scripted {
    respond: Responder,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    pub(crate) fn new(
        respond: impl Fn(&str) -> formulary_llm::Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always replies with `reply`.
    pub(crate) fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Always fails.
    pub(crate) fn failing() -> Self {
        Self::new(|_| Err(LlmError::Unavailable("scripted failure".into())))
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionService for Scripted {
    fn complete(&self, prompt: &str, _conversation_id: Option<&str>) -> formulary_llm::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }
}
