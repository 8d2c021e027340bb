//! The composite operation: requirement text in, tested formula out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use formulary_catalog::catalog::Catalog;
use formulary_catalog::search::SimilaritySearch;
use formulary_core::analysis::RequirementAnalysis;
use formulary_core::mapping::MappingResult;
use formulary_core::selection::SelectionResult;
use formulary_core::synthesis::SynthesisResult;
use formulary_core::testing::TestingResult;
use formulary_llm::retry::{DEFAULT_RETRY_WINDOW, is_retry_request, retry_context};
use formulary_llm::{CompletionService, ConversationMemory, Message};

use crate::analyzer::RequirementAnalyzer;
use crate::mapper::FunctionMapper;
use crate::selector::FunctionSelector;
use crate::synthesizer::FormulaSynthesizer;
use crate::tester::FormulaTester;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analyze,
    Map,
    Select,
    Synthesize,
    Test,
}

/// Every artifact produced by a run. Stages after the requested last one
/// are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    /// The query the stages actually ran on; differs from the input when a
    /// retry request was resolved to an earlier query.
    pub query: String,
    pub analysis: RequirementAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testing: Option<TestingResult>,
}

impl GenerationOutcome {
    /// The primary formula, once synthesis has run.
    pub fn formula(&self) -> Option<&str> {
        self.synthesis.as_ref().map(|s| s.primary_formula.as_str())
    }
}

/// The five stages wired together, plus optional conversation memory.
pub struct Pipeline {
    analyzer: RequirementAnalyzer,
    mapper: FunctionMapper,
    selector: FunctionSelector,
    synthesizer: FormulaSynthesizer,
    tester: FormulaTester,
    memory: Option<Arc<dyn ConversationMemory>>,
    retry_window: usize,
}

impl Pipeline {
    pub fn new(service: Arc<dyn CompletionService>, catalog: Arc<Catalog>) -> Self {
        Self {
            analyzer: RequirementAnalyzer::new(Arc::clone(&service)),
            mapper: FunctionMapper::new(service),
            selector: FunctionSelector::new(catalog),
            synthesizer: FormulaSynthesizer::new(),
            tester: FormulaTester::new(),
            memory: None,
            retry_window: DEFAULT_RETRY_WINDOW,
        }
    }

    /// Adds documentation snippets to the analysis prompt.
    pub fn with_search(mut self, search: Arc<dyn SimilaritySearch>, snippets: usize) -> Self {
        self.analyzer = self.analyzer.with_search(search, snippets);
        self
    }

    pub fn with_enhance_below(mut self, threshold: f64) -> Self {
        self.mapper = self.mapper.with_enhance_below(threshold);
        self
    }

    /// Records exchanges and resolves retry requests against `memory`.
    pub fn with_memory(mut self, memory: Arc<dyn ConversationMemory>, retry_window: usize) -> Self {
        self.memory = Some(memory);
        self.retry_window = retry_window;
        self
    }

    /// Runs all five stages.
    pub fn generate_formula(&self, query: &str, session: Option<&str>) -> GenerationOutcome {
        self.run_until(query, Stage::Test, session)
    }

    /// Runs the stages up to and including `last`.
    pub fn run_until(&self, query: &str, last: Stage, session: Option<&str>) -> GenerationOutcome {
        let resolved = self.resolve_query(query, session);
        info!(session = session.unwrap_or("-"), last = ?last, "pipeline started");

        let analysis = self.analyzer.analyze(&resolved, session);
        let mapping = (last >= Stage::Map).then(|| self.mapper.map(&analysis, session));
        let selection = mapping
            .as_ref()
            .filter(|_| last >= Stage::Select)
            .map(|m| self.selector.select(&analysis, m, session));
        let synthesis = match (&mapping, &selection) {
            (Some(m), Some(s)) if last >= Stage::Synthesize => {
                Some(self.synthesizer.synthesize(&analysis, m, s, session))
            }
            _ => None,
        };
        let testing = synthesis
            .as_ref()
            .filter(|_| last >= Stage::Test)
            .map(|s| self.tester.test(&analysis, s, session));

        let outcome = GenerationOutcome {
            query: resolved,
            analysis,
            mapping,
            selection,
            synthesis,
            testing,
        };
        info!(
            session = session.unwrap_or("-"),
            formula = outcome.formula().unwrap_or("-"),
            score = outcome.testing.as_ref().map_or(0.0, |t| t.overall_score),
            "pipeline finished"
        );
        self.record(query, &outcome, session);
        outcome
    }

    /// Swaps a retry request for the last real query of the conversation.
    fn resolve_query(&self, query: &str, session: Option<&str>) -> String {
        let (Some(memory), Some(session)) = (&self.memory, session) else {
            return query.to_string();
        };
        if !is_retry_request(query) {
            return query.to_string();
        }
        match retry_context(memory.as_ref(), session, self.retry_window) {
            Ok(context) => match context.last_query {
                Some(previous) => {
                    info!(session, previous = %previous, "retrying previous request");
                    previous
                }
                None => {
                    debug!(session, "retry requested with nothing to retry");
                    query.to_string()
                }
            },
            Err(e) => {
                warn!(session, error = %e, "could not read conversation memory");
                query.to_string()
            }
        }
    }

    fn record(&self, query: &str, outcome: &GenerationOutcome, session: Option<&str>) {
        let (Some(memory), Some(session)) = (&self.memory, session) else {
            return;
        };
        let mut messages = vec![Message::user(query)];
        if let Some(formula) = outcome.formula() {
            messages.push(Message::assistant(formula));
        }
        for message in messages {
            if let Err(e) = memory.append(session, message) {
                warn!(session, error = %e, "could not record exchange");
                return;
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("analyzer", &self.analyzer)
            .field("mapper", &self.mapper)
            .field("selector", &self.selector)
            .field("memory", &self.memory.is_some())
            .field("retry_window", &self.retry_window)
            .finish()
    }
}
