//! Configuration for formulary.
//!
//! Settings are layered with figment: built-in defaults, then
//! `.formulary/config.yaml`, then `FORMULARY_*` environment variables. The
//! `.formulary/` directory is found by walking up from the working directory
//! unless `FORMULARY_DIR` points elsewhere.

pub mod config;
pub mod formulary_dir;

pub use config::{ConfigError, FormularyConfig, Provider, Result, load_config, save_config};
