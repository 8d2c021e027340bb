//! Routing of chat messages between formula generation and general chat.

use serde::Serialize;
use tracing::{debug, warn};

use crate::reasoning::strip_reasoning;
use crate::service::CompletionService;

/// What a message is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Formula,
    General,
}

fn classification_prompt(message: &str) -> String {
    format!(
        "Based on the conversation history and current request, classify this into 'FORMULA' or 'GENERAL'.\n\n\
         Current request: {message}\n\n\
         Classification rules:\n\
         - FORMULA: Requests for CRM formulas, calculations, or formula-related help\n\
         - GENERAL: Everything else including general questions, greetings, follow-ups\n\n\
         Respond with single word: FORMULA or GENERAL"
    )
}

/// Asks the service to label `message`. Anything other than a clear
/// `FORMULA` answer, including a failed call, counts as general.
pub fn classify(
    service: &dyn CompletionService,
    message: &str,
    conversation_id: Option<&str>,
) -> MessageKind {
    match service.complete(&classification_prompt(message), conversation_id) {
        Ok(reply) => {
            let label = strip_reasoning(&reply).to_uppercase();
            debug!(label = %label, "message classified");
            if label == "FORMULA" {
                MessageKind::Formula
            } else {
                MessageKind::General
            }
        }
        Err(e) => {
            warn!(error = %e, "classification failed, treating message as general");
            MessageKind::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::service::OfflineCompletion;

    struct Fixed(&'static str);

    impl CompletionService for Fixed {
        fn complete(&self, prompt: &str, _conversation_id: Option<&str>) -> Result<String> {
            assert!(prompt.contains("FORMULA or GENERAL"));
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn formula_label() {
        assert_eq!(classify(&Fixed("<think>hmm</think> formula"), "sum", None), MessageKind::Formula);
    }

    #[test]
    fn anything_else_is_general() {
        assert_eq!(classify(&Fixed("GENERAL"), "hi", None), MessageKind::General);
        assert_eq!(classify(&Fixed("It is a FORMULA"), "hi", None), MessageKind::General);
        assert_eq!(classify(&OfflineCompletion, "hi", None), MessageKind::General);
    }
}
