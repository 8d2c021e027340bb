//! Runtime context for command execution.
//!
//! [`RuntimeContext`] holds the global flags. Commands that need the
//! pipeline call [`RuntimeContext::services`], which loads configuration and
//! wires the completion service, catalog, search index and memory together.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use formulary_catalog::CatalogStore;
use formulary_catalog::search::{KeywordSearch, SimilaritySearch};
use formulary_catalog::source::FileCatalog;
use formulary_config::config::{LlmConfig, load_config_file};
use formulary_config::formulary_dir::find_formulary_dir;
use formulary_config::{FormularyConfig, Provider, load_config};
use formulary_llm::{
    CompletionService, ConversationMemory, HttpCompletionClient, HttpSettings,
    InMemoryConversationMemory, OfflineCompletion,
};
use formulary_pipeline::Pipeline;
use formulary_pipeline::drafting::Drafter;
use formulary_pipeline::research::Researcher;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Explicit config file from `--config`.
    pub config_path: Option<PathBuf>,

    /// Conversation id from `--session`.
    pub session: Option<String>,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            json: global.json,
            verbose: global.verbose,
            config_path: global.config.clone(),
            session: global
                .session
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// The `.formulary/` directory above the working directory, if any.
    pub fn formulary_dir(&self) -> Option<PathBuf> {
        let cwd = env::current_dir().ok()?;
        find_formulary_dir(&cwd)
    }

    /// Loads configuration from `--config`, or from the discovered
    /// `.formulary/` directory, layered under the environment.
    pub fn load_config(&self) -> Result<FormularyConfig> {
        match &self.config_path {
            Some(path) => load_config_file(path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            None => {
                let dir = self.formulary_dir();
                debug!(dir = ?dir, "loading configuration");
                load_config(dir.as_deref()).context("failed to load configuration")
            }
        }
    }

    /// Loads configuration and builds everything the pipeline commands use.
    pub fn services(&self) -> Result<Services> {
        let config = self.load_config()?;
        let base = self
            .config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .or_else(|| self.formulary_dir());
        Services::open(config, base.as_deref())
    }
}

/// Everything wired from one configuration.
pub struct Services {
    pub config: FormularyConfig,
    /// Stateless client used by pipeline stages.
    pub service: Arc<dyn CompletionService>,
    /// Client that replays and records the conversation, for chat replies.
    pub chat_service: Arc<dyn CompletionService>,
    pub catalog: CatalogStore,
    pub search: Arc<dyn SimilaritySearch>,
    pub memory: Arc<dyn ConversationMemory>,
}

impl Services {
    /// `base` resolves a relative `catalog.path`.
    pub fn open(config: FormularyConfig, base: Option<&Path>) -> Result<Self> {
        let catalog = match &config.catalog.path {
            Some(path) => {
                let path = match base {
                    Some(base) if path.is_relative() => base.join(path),
                    _ => path.clone(),
                };
                CatalogStore::open(FileCatalog::new(&path))
                    .with_context(|| format!("failed to load catalog from {}", path.display()))?
            }
            None => CatalogStore::bundled().context("failed to load bundled catalog")?,
        };
        let search: Arc<dyn SimilaritySearch> =
            Arc::new(KeywordSearch::from_catalog(&catalog.snapshot()));
        let memory: Arc<dyn ConversationMemory> =
            Arc::new(InMemoryConversationMemory::new(config.memory.max_messages));
        let (service, chat_service) = completion_services(&config.llm, &memory);

        Ok(Self {
            config,
            service,
            chat_service,
            catalog,
            search,
            memory,
        })
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::clone(&self.service), self.catalog.snapshot())
            .with_search(Arc::clone(&self.search), self.config.pipeline.snippets)
            .with_enhance_below(self.config.pipeline.enhance_below)
            .with_memory(Arc::clone(&self.memory), self.config.memory.retry_window)
    }

    pub fn drafter(&self) -> Drafter {
        Drafter::new(Arc::clone(&self.service), self.catalog.snapshot())
            .with_search(Arc::clone(&self.search), self.config.pipeline.snippets)
    }

    pub fn researcher(&self) -> Researcher {
        Researcher::new(Arc::clone(&self.service)).with_questions(self.config.research.questions)
    }
}

fn completion_services(
    llm: &LlmConfig,
    memory: &Arc<dyn ConversationMemory>,
) -> (Arc<dyn CompletionService>, Arc<dyn CompletionService>) {
    match llm.provider {
        Provider::Offline => {
            debug!("offline provider, every stage will use its fallback");
            (Arc::new(OfflineCompletion), Arc::new(OfflineCompletion))
        }
        Provider::Openai => {
            let api_key = llm.api_key();
            if api_key.is_none() {
                warn!(env = %llm.api_key_env, "no API key set, sending requests without one");
            }
            let settings = HttpSettings {
                base_url: llm.base_url.clone(),
                model: llm.model.clone(),
                api_key,
                temperature: llm.temperature,
                max_tokens: llm.max_tokens,
                timeout: (llm.timeout_secs > 0).then(|| Duration::from_secs(llm.timeout_secs)),
            };
            let chat = HttpCompletionClient::new(settings.clone()).with_memory(Arc::clone(memory));
            (Arc::new(HttpCompletionClient::new(settings)), Arc::new(chat))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn global(session: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            json: true,
            verbose: false,
            config: None,
            session: session.map(str::to_string),
        }
    }

    #[test]
    fn blank_session_is_none() {
        assert_eq!(RuntimeContext::from_global_args(&global(Some("  "))).session(), None);
        assert_eq!(
            RuntimeContext::from_global_args(&global(Some(" s1 "))).session(),
            Some("s1")
        );
    }

    #[test]
    fn default_services_use_bundled_catalog() {
        let services = Services::open(FormularyConfig::default(), None).unwrap();
        assert_eq!(services.catalog.snapshot().len(), 51);
        assert!(services.service.complete("hi", None).is_err());
    }

    #[test]
    fn relative_catalog_path_resolves_against_base() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FormularyConfig::default();
        config.catalog.path = Some(PathBuf::from("missing.json"));
        let err = Services::open(config, Some(dir.path())).err().unwrap();
        assert!(format!("{err:#}").contains(&dir.path().join("missing.json").display().to_string()));
    }
}
