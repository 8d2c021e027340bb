//! Configuration types and loading.
//!
//! [`FormularyConfig`] mirrors `.formulary/config.yaml`. [`load_config`]
//! layers defaults, the file and the environment; [`save_config`] writes the
//! file back.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be serialized as YAML.
    #[error("failed to write config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// A layer held values of the wrong shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The `.formulary/` directory was not found.
    #[error("no .formulary directory found (run 'formulary config init' first)")]
    DirNotFound,

    /// A configuration value was out of range.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The offending key, dotted.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// File name inside `.formulary/`.
pub const CONFIG_FILE: &str = "config.yaml";

/// Prefix of environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "FORMULARY_";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Which completion service backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// No model; every stage uses its fallback.
    #[default]
    Offline,
    /// An OpenAI-compatible chat-completions endpoint.
    Openai,
}

/// Completion service section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Whole-request timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Offline,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Conversation memory section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Messages kept per conversation.
    pub max_messages: usize,
    /// Messages consulted when handling a retry request.
    pub retry_window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 20,
            retry_window: 5,
        }
    }
}

/// Catalog section. Without a path the bundled catalog is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Mapping confidence below which an enhancement request is sent.
    pub enhance_below: f64,
    /// Documentation snippets added to prompts.
    pub snippets: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enhance_below: 0.8,
            snippets: 3,
        }
    }
}

/// Research fan-out section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Sub-questions generated per topic.
    pub questions: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self { questions: 5 }
    }
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FormularyConfig {
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub catalog: CatalogConfig,
    pub pipeline: PipelineConfig,
    pub research: ResearchConfig,
}

impl FormularyConfig {
    /// Rejects values no component can work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, reason: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return invalid("llm.temperature", "must be between 0 and 2");
        }
        if self.llm.max_tokens == 0 {
            return invalid("llm.max_tokens", "must be positive");
        }
        if self.memory.max_messages == 0 {
            return invalid("memory.max_messages", "must be positive");
        }
        if !(0.0..=1.0).contains(&self.pipeline.enhance_below) {
            return invalid("pipeline.enhance_below", "must be between 0 and 1");
        }
        if self.research.questions == 0 {
            return invalid("research.questions", "must be positive");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

fn layered(config_file: Option<&Path>, env: Env) -> Result<FormularyConfig> {
    let mut figment = Figment::from(Serialized::defaults(FormularyConfig::default()));
    if let Some(path) = config_file {
        // An empty file is valid and contributes nothing.
        if path.exists() && !std::fs::read_to_string(path)?.trim().is_empty() {
            debug!(path = %path.display(), "merging config file");
            figment = figment.merge(Yaml::file(path));
        }
    }
    let config: FormularyConfig = figment.merge(env).extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration for a `.formulary/` directory, or defaults plus
/// environment when there is none.
pub fn load_config(formulary_dir: Option<&Path>) -> Result<FormularyConfig> {
    let path = formulary_dir.map(|dir| dir.join(CONFIG_FILE));
    layered(path.as_deref(), Env::prefixed(ENV_PREFIX).split("__"))
}

/// Loads an explicit config file, then the environment.
pub fn load_config_file(path: &Path) -> Result<FormularyConfig> {
    if !path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    layered(Some(path), Env::prefixed(ENV_PREFIX).split("__"))
}

/// Writes `config` to `<formulary_dir>/config.yaml`, creating the directory.
pub fn save_config(formulary_dir: &Path, config: &FormularyConfig) -> Result<PathBuf> {
    std::fs::create_dir_all(formulary_dir)?;
    let path = formulary_dir.join(CONFIG_FILE);
    std::fs::write(&path, serde_yaml::to_string(config)?)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// An environment layer nobody sets.
    fn no_env() -> Env {
        Env::prefixed("FORMULARY_UNSET_TEST_PREFIX_").split("__")
    }

    #[test]
    fn defaults() {
        let cfg = FormularyConfig::default();
        assert_eq!(cfg.llm.provider, Provider::Offline);
        assert_eq!(cfg.memory.max_messages, 20);
        assert_eq!(cfg.memory.retry_window, 5);
        assert_eq!(cfg.pipeline.enhance_below, 0.8);
        assert_eq!(cfg.research.questions, 5);
        assert!(cfg.catalog.path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_and_empty_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert_eq!(layered(Some(&path), no_env()).unwrap(), FormularyConfig::default());

        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(layered(Some(&path), no_env()).unwrap(), FormularyConfig::default());
    }

    #[test]
    fn file_overrides_defaults_partially() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "llm:\n  provider: openai\n  model: local-model\nresearch:\n  questions: 3\n",
        )
        .unwrap();

        let cfg = layered(Some(&path), no_env()).unwrap();
        assert_eq!(cfg.llm.provider, Provider::Openai);
        assert_eq!(cfg.llm.model, "local-model");
        assert_eq!(cfg.llm.max_tokens, 1024);
        assert_eq!(cfg.research.questions, 3);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "memory:\n  max_messages: 10\n").unwrap();

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("FORMULARY_ENVTEST_MEMORY__MAX_MESSAGES", "7") };
        let cfg = layered(
            Some(&path),
            Env::prefixed("FORMULARY_ENVTEST_").split("__"),
        )
        .unwrap();
        unsafe { std::env::remove_var("FORMULARY_ENVTEST_MEMORY__MAX_MESSAGES") };

        assert_eq!(cfg.memory.max_messages, 7);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "pipeline:\n  enhance_below: 1.5\n").unwrap();
        let err = layered(Some(&path), no_env()).unwrap_err();
        assert!(err.to_string().contains("pipeline.enhance_below"));

        std::fs::write(&path, "memory:\n  max_messages: lots\n").unwrap();
        assert!(matches!(
            layered(Some(&path), no_env()).unwrap_err(),
            ConfigError::Load(_)
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = FormularyConfig::default();
        cfg.llm.provider = Provider::Openai;
        cfg.catalog.path = Some(PathBuf::from("catalog.toml"));

        let path = save_config(dir.path(), &cfg).unwrap();
        assert!(path.ends_with(CONFIG_FILE));
        assert_eq!(layered(Some(&path), no_env()).unwrap(), cfg);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(load_config_file(Path::new("/nonexistent/config.yaml")).is_err());
    }

    #[test]
    fn api_key_reads_named_variable() {
        let cfg = LlmConfig {
            api_key_env: "FORMULARY_TEST_NO_SUCH_KEY".to_string(),
            ..LlmConfig::default()
        };
        assert!(cfg.api_key().is_none());
    }
}
