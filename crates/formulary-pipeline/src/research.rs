//! Topic research: fan a topic out into questions, answer them in parallel
//! and synthesize a Markdown report.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use formulary_llm::CompletionService;

use crate::error::Result;

pub const DEFAULT_QUESTIONS: usize = 5;

const DEFAULT_ATTEMPTS: u32 = 3;

const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Research text longer than this (in estimated tokens) is synthesized in
/// chunks first.
const CHUNK_TOKENS: usize = 4000;

fn questions_prompt(topic: &str, count: usize) -> String {
    format!(
        "Generate {count} critical research questions about '{topic}' that would help create a comprehensive report.\n\
         Focus on: historical context, current state, key players, challenges, and future prospects.\n\
         Return only a numbered list of questions."
    )
}

fn answer_prompt(question: &str) -> String {
    format!(
        "Research and provide a detailed answer to this question: '{question}'. \
         Include: 1. Key facts and statistics 2. Expert opinions 3. Recent developments \
         4. Credible sources 5. Controversies or debates \
         Be comprehensive and cite sources where possible."
    )
}

fn synthesis_prompt(topic: &str, research: &str) -> String {
    format!(
        "Based on this research about '{topic}':\n{research}\n\n\
         Create a synthesis section that: 1. Identifies key themes and patterns \
         2. Highlights most significant findings 3. Addresses contradictions in the research \
         4. Provides evidence-based conclusions 5. Suggests areas for further research \
         Keep the synthesis concise (under 1000 words) and well-structured."
    )
}

fn chunk_prompt(topic: &str, chunk: &str, total: usize) -> String {
    format!(
        "This is part of a {total}-part research document about '{topic}'. \
         Analyze this section and provide key findings, patterns, and insights. \
         Focus on extracting the most important information that would contribute to a final synthesis.\n\n{chunk}"
    )
}

/// Rough token count: four characters per token.
fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Splits `text` at paragraph breaks into chunks of at most `max_tokens`
/// estimated tokens. A single oversized paragraph becomes its own chunk.
fn split_into_chunks(text: &str, max_tokens: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        if !current.is_empty() && estimate_tokens(&current) + estimate_tokens(paragraph) > max_tokens {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(paragraph);
        current.push_str("\n\n");
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub question: String,
    pub answer: String,
    pub failed: bool,
}

/// A finished research report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    pub topic: String,
    pub findings: Vec<Finding>,
    pub synthesis: String,
}

impl ResearchReport {
    /// Title and one section per question.
    fn body(topic: &str, findings: &[Finding]) -> String {
        let mut out = format!("# Research Report: {topic}\n\n");
        for finding in findings {
            out.push_str(&format!("## {}\n\n{}\n\n", finding.question, finding.answer));
        }
        out
    }

    /// The report as Markdown.
    pub fn render(&self) -> String {
        let mut out = Self::body(&self.topic, &self.findings);
        out.push_str("# Synthesis and Conclusions\n\n");
        out.push_str(&self.synthesis);
        out
    }
}

pub struct Researcher {
    service: Arc<dyn CompletionService>,
    questions: usize,
    attempts: u32,
    backoff: Duration,
}

impl Researcher {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            questions: DEFAULT_QUESTIONS,
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_questions(mut self, questions: usize) -> Self {
        self.questions = questions.max(1);
        self
    }

    /// Retry policy for question generation; the delay doubles after each
    /// failed attempt.
    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Asks for research questions about `topic`.
    pub fn questions(&self, topic: &str) -> Result<Vec<String>> {
        let prompt = questions_prompt(topic, self.questions);
        let mut delay = self.backoff;
        let mut attempt = 1;
        let reply = loop {
            match self.service.complete(&prompt, None) {
                Ok(reply) => break reply,
                Err(e) if attempt < self.attempts => {
                    warn!(attempt, error = %e, "question generation failed, retrying");
                    thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        Ok(reply
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(self.questions)
            .map(str::to_string)
            .collect())
    }

    /// Answers every question concurrently. Results keep question order; a
    /// failed answer is reported in place of the answer text.
    pub fn answer_all(&self, questions: &[String]) -> Vec<Finding> {
        questions
            .par_iter()
            .map(|question| match self.service.complete(&answer_prompt(question), None) {
                Ok(answer) => Finding {
                    question: question.clone(),
                    answer,
                    failed: false,
                },
                Err(e) => {
                    warn!(question = %question, error = %e, "failed to research question");
                    Finding {
                        question: question.clone(),
                        answer: format!("Error occurred while researching this question: {e}"),
                        failed: true,
                    }
                }
            })
            .collect()
    }

    fn synthesize(&self, topic: &str, research: &str) -> Result<String> {
        if estimate_tokens(research) < CHUNK_TOKENS {
            return Ok(self.service.complete(&synthesis_prompt(topic, research), None)?);
        }
        let chunks = split_into_chunks(research, CHUNK_TOKENS);
        debug!(chunks = chunks.len(), "synthesizing research in chunks");
        let partial = chunks
            .par_iter()
            .map(|chunk| self.service.complete(&chunk_prompt(topic, chunk, chunks.len()), None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(self
            .service
            .complete(&synthesis_prompt(topic, &partial.join("\n\n")), None)?)
    }

    /// Runs the full research flow for `topic`.
    pub fn research(&self, topic: &str) -> Result<ResearchReport> {
        let questions = self.questions(topic)?;
        info!(topic, questions = questions.len(), "generated research questions");

        let findings = self.answer_all(&questions);
        let body = ResearchReport::body(topic, &findings);
        let synthesis = match self.synthesize(topic, &body) {
            Ok(text) => text,
            Err(e) => {
                warn!(topic, error = %e, "synthesis failed");
                format!("Synthesis could not be generated: {e}")
            }
        };
        info!(
            topic,
            failed = findings.iter().filter(|f| f.failed).count(),
            "research report complete"
        );
        Ok(ResearchReport {
            topic: topic.to_string(),
            findings,
            synthesis,
        })
    }
}

impl std::fmt::Debug for Researcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Researcher")
            .field("questions", &self.questions)
            .field("attempts", &self.attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Scripted;
    use formulary_llm::LlmError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn researcher(service: Scripted) -> Researcher {
        Researcher::new(Arc::new(service)).with_retry(3, Duration::ZERO)
    }

    fn scripted_topic() -> Scripted {
        Scripted::new(|prompt| {
            if prompt.starts_with("Generate") {
                Ok("1. Where did it start?\n\n2. Who leads it?\n3. What is next?\n".into())
            } else if prompt.contains("Who leads it?") && prompt.starts_with("Research") {
                Err(LlmError::Unavailable("rate limited".into()))
            } else if let Some(rest) = prompt.strip_prefix("Research and provide a detailed answer to this question: '") {
                let question = rest.split('\'').next().unwrap_or_default();
                Ok(format!("Answer to {question}"))
            } else {
                Ok("It all fits together.".into())
            }
        })
    }

    #[test]
    fn report_keeps_question_order_and_marks_failures() {
        let report = researcher(scripted_topic()).research("Solar power").unwrap();
        let questions: Vec<&str> = report.findings.iter().map(|f| f.question.as_str()).collect();
        assert_eq!(questions, vec!["1. Where did it start?", "2. Who leads it?", "3. What is next?"]);
        assert!(report.findings[1].failed);
        assert!(
            report.findings[1]
                .answer
                .starts_with("Error occurred while researching this question: ")
        );
        assert_eq!(report.findings[2].answer, "Answer to 3. What is next?");
        assert_eq!(report.synthesis, "It all fits together.");

        let rendered = report.render();
        assert!(rendered.starts_with("# Research Report: Solar power\n\n## 1. Where did it start?\n\n"));
        assert!(rendered.ends_with("# Synthesis and Conclusions\n\nIt all fits together."));
    }

    #[test]
    fn question_count_is_capped() {
        let service = Scripted::replying("a\nb\nc\nd");
        let questions = Researcher::new(Arc::new(service)).with_questions(2).questions("x").unwrap();
        assert_eq!(questions, vec!["a", "b"]);
    }

    #[test]
    fn question_generation_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let service = Scripted::new(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::Unavailable("busy".into()))
            } else {
                Ok("1. Why?".into())
            }
        });
        let questions = researcher(service).questions("x").unwrap();
        assert_eq!(questions, vec!["1. Why?"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn question_generation_gives_up() {
        let err = researcher(Scripted::failing()).research("x").unwrap_err();
        assert!(err.to_string().contains("scripted failure"));
    }

    #[test]
    fn long_research_is_chunked() {
        let paragraph = "x".repeat(12_000);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let chunks = split_into_chunks(&text, CHUNK_TOKENS);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.ends_with("\n\n")));

        let short = split_into_chunks("a\n\nb", CHUNK_TOKENS);
        assert_eq!(short, vec!["a\n\nb\n\n"]);
    }

    #[test]
    fn chunked_synthesis_combines_partials() {
        let service = Arc::new(Scripted::new(|prompt| {
            if prompt.starts_with("This is part") {
                Ok("partial".into())
            } else {
                Ok(format!("final over {} bytes", prompt.len()))
            }
        }));
        let researcher = Researcher::new(service.clone());
        let research = format!("{}\n\n{}", "y".repeat(12_000), "z".repeat(12_000));
        let synthesis = researcher.synthesize("topic", &research).unwrap();
        assert!(synthesis.starts_with("final over"));
        let chunk_calls = service
            .prompts()
            .iter()
            .filter(|p| p.starts_with("This is part"))
            .count();
        assert_eq!(chunk_calls, 2);
    }
}
