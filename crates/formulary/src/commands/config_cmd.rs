//! `formulary config` -- show or create configuration.

use std::env;

use anyhow::{Context, Result, bail};
use formulary_config::config::CONFIG_FILE;
use formulary_config::formulary_dir::ensure_formulary_dir;
use formulary_config::{FormularyConfig, save_config};

use crate::cli::{ConfigArgs, ConfigCommands};
use crate::context::RuntimeContext;
use crate::output::{muted, output_json};

/// Execute the `formulary config` command.
pub fn run(ctx: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    match &args.command {
        ConfigCommands::Show => {
            let config = ctx.load_config()?;
            if ctx.json {
                output_json(&config);
            } else {
                let origin = match (&ctx.config_path, ctx.formulary_dir()) {
                    (Some(path), _) => path.display().to_string(),
                    (None, Some(dir)) => dir.join(CONFIG_FILE).display().to_string(),
                    (None, None) => "defaults".to_string(),
                };
                println!("{}", muted(&format!("# from {origin} and FORMULARY_* overrides")));
                print!(
                    "{}",
                    serde_yaml::to_string(&config).context("failed to render config")?
                );
            }
        }

        ConfigCommands::Init { force } => {
            let cwd = env::current_dir().context("cannot determine working directory")?;
            let dir = ensure_formulary_dir(&cwd)?;
            let path = dir.join(CONFIG_FILE);
            if path.exists() && !force {
                bail!(
                    "{} already exists\nHint: pass --force to overwrite it",
                    path.display()
                );
            }
            let written = save_config(&dir, &FormularyConfig::default())?;
            if ctx.json {
                output_json(&serde_json::json!({
                    "path": written.display().to_string(),
                }));
            } else {
                println!("Wrote {}", written.display());
            }
        }
    }
    Ok(())
}
