//! `formulary` -- plain-language business requirements in, CRM formulas out.
//!
//! Parses CLI arguments with clap, builds the runtime context, and dispatches
//! to command handlers. Every handler returns `anyhow::Result`; errors are
//! printed once here.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use formulary_pipeline::pipeline::Stage;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

fn main() {
    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    // Logs go to stderr so that stdout stays parseable with --json.
    let filter = if ctx.verbose {
        EnvFilter::new("formulary=debug,formulary_pipeline=debug,formulary_llm=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Some(Commands::Analyze(args)) => commands::stage::run(&ctx, &args, Stage::Analyze),
        Some(Commands::Map(args)) => commands::stage::run(&ctx, &args, Stage::Map),
        Some(Commands::Select(args)) => commands::stage::run(&ctx, &args, Stage::Select),
        Some(Commands::Synthesize(args)) => commands::stage::run(&ctx, &args, Stage::Synthesize),
        Some(Commands::Test(args)) => commands::stage::run(&ctx, &args, Stage::Test),
        Some(Commands::Generate(args)) => commands::generate::run(&ctx, &args),
        Some(Commands::Research(args)) => commands::research::run(&ctx, &args),
        Some(Commands::Draft(args)) => commands::draft::run(&ctx, &args),
        Some(Commands::Chat) => commands::chat::run(&ctx),
        Some(Commands::Catalog(args)) => commands::catalog::run(&ctx, &args),
        Some(Commands::Config(args)) => commands::config_cmd::run(&ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(&ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}
