//! `formulary chat` -- a conversation over stdin.
//!
//! Each line is classified as a formula request or general chat. Formula
//! requests run the full pipeline; everything else is a plain completion.
//! "Try again" style lines are resolved against the session's memory before
//! classification, so a retried formula request goes back through the
//! pipeline.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use crossterm::tty::IsTty;
use serde::Serialize;
use tracing::{debug, warn};

use formulary_llm::classify::{MessageKind, classify};
use formulary_llm::retry::{is_retry_request, retry_context, retry_prompt};
use formulary_pipeline::GenerationOutcome;

use crate::commands::generate::print_summary;
use crate::context::{RuntimeContext, Services};
use crate::output::{muted, output_json, warn as warn_style};

/// Session id used when `--session` is not given.
const DEFAULT_SESSION: &str = "chat";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Turn<'a> {
    kind: MessageKind,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a GenerationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute the `formulary chat` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let services = ctx.services()?;
    let pipeline = services.pipeline();
    let session = ctx.session().unwrap_or(DEFAULT_SESSION);
    let stdin = io::stdin();
    let interactive = stdin.is_tty();

    if interactive && !ctx.json {
        println!("{}", muted("Describe a formula, ask a question, or type 'exit'."));
    }
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            eprint!("> ");
            let _ = io::stderr().flush();
        }
        let Some(line) = lines.next() else { break };
        let line = line.context("failed to read from stdin")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_ascii_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let previous = previous_query(&services, session, input);
        let subject = previous.as_deref().unwrap_or(input);
        match classify(services.service.as_ref(), subject, Some(session)) {
            MessageKind::Formula => {
                let outcome = pipeline.generate_formula(input, Some(session));
                if ctx.json {
                    output_json(&Turn {
                        kind: MessageKind::Formula,
                        input,
                        outcome: Some(&outcome),
                        reply: None,
                        error: None,
                    });
                } else {
                    print_summary(input, &outcome);
                    println!();
                }
            }
            MessageKind::General => {
                let prompt = match &previous {
                    Some(previous) => retry_prompt(previous, input),
                    None => input.to_string(),
                };
                let result = services.chat_service.complete(&prompt, Some(session));
                if let Err(e) = &result {
                    warn!(session, error = %e, "chat reply failed");
                }
                if ctx.json {
                    output_json(&Turn {
                        kind: MessageKind::General,
                        input,
                        outcome: None,
                        reply: result.as_deref().ok(),
                        error: result.as_ref().err().map(ToString::to_string),
                    });
                } else {
                    match &result {
                        Ok(reply) => println!("{}\n", reply.trim()),
                        Err(e) => println!("{}\n", warn_style(&format!("No reply: {e}"))),
                    }
                }
            }
        }
    }
    Ok(())
}

/// For a retry request, the last real query of the session.
fn previous_query(services: &Services, session: &str, input: &str) -> Option<String> {
    if !is_retry_request(input) {
        return None;
    }
    match retry_context(
        services.memory.as_ref(),
        session,
        services.config.memory.retry_window,
    ) {
        Ok(context) => {
            debug!(session, previous = ?context.last_query, "retry request");
            context.last_query
        }
        Err(e) => {
            warn!(session, error = %e, "could not read conversation memory");
            None
        }
    }
}
