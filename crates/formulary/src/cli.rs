//! CLI argument definitions, using clap derive.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use formulary_core::enums::FunctionCategory;

/// formulary -- turn business requirements into CRM formulas.
#[derive(Parser, Debug)]
#[command(
    name = "formulary",
    about = "Turn plain-language business requirements into CRM formulas",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of .formulary/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Conversation id; enables memory and "try again" handling
    #[arg(long, global = true, value_name = "ID")]
    pub session: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a requirement and print the structured analysis
    Analyze(QueryArgs),

    /// Analyze, then map requested operations onto catalog functions
    Map(QueryArgs),

    /// Run up to function selection and print the selection
    Select(QueryArgs),

    /// Run up to synthesis and print the candidate formulas
    Synthesize(QueryArgs),

    /// Run every stage and print the test report
    Test(QueryArgs),

    /// Generate a formula: all five stages, summarized
    Generate(QueryArgs),

    /// Research a topic with a fan-out of sub-questions
    Research(ResearchArgs),

    /// Draft a formula directly from catalog context in one model call
    Draft(QueryArgs),

    /// Interactive session: read requests from stdin, one per line
    Chat,

    /// Browse the function catalog
    Catalog(CatalogArgs),

    /// Show or create configuration
    Config(ConfigArgs),

    /// Generate shell completion scripts
    Completion(CompletionArgs),
}

// ---------------------------------------------------------------------------
// Query commands
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The requirement in plain language; words are joined with spaces
    #[arg(required = true, num_args = 1.., value_name = "REQUIREMENT")]
    pub query: Vec<String>,
}

impl QueryArgs {
    pub fn text(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// Topic to research
    #[arg(required = true, num_args = 1.., value_name = "TOPIC")]
    pub topic: Vec<String>,

    /// Number of sub-questions (overrides research.questions)
    #[arg(long, short = 'n')]
    pub questions: Option<usize>,
}

impl ResearchArgs {
    pub fn text(&self) -> String {
        self.topic.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// List functions, optionally limited to one category
    List {
        /// Category tag, e.g. MATH or date_time
        #[arg(long, short = 'c')]
        category: Option<FunctionCategory>,
    },

    /// Show one function's full definition
    Show {
        /// Function name (case-insensitive)
        name: String,
    },

    /// Search function documentation
    Search {
        /// Search text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Rank by keyword overlap instead of substring match
        #[arg(long)]
        ranked: bool,

        /// Maximum number of ranked results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Show catalog statistics
    Stats,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default .formulary/config.yaml in the current directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate bash completion script
    Bash,
    /// Generate zsh completion script
    Zsh,
    /// Generate fish completion script
    Fish,
    /// Generate PowerShell completion script
    Powershell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_words_are_joined() {
        let cli = Cli::parse_from(["formulary", "generate", "5%", "commission", "--json"]);
        assert!(cli.global.json);
        match cli.command {
            Some(Commands::Generate(args)) => assert_eq!(args.text(), "5% commission"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn category_flag_parses_leniently() {
        let cli = Cli::parse_from(["formulary", "catalog", "list", "--category", "date-time"]);
        match cli.command {
            Some(Commands::Catalog(CatalogArgs {
                command: CatalogCommands::List { category },
            })) => assert_eq!(category, Some(FunctionCategory::DateTime)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn session_is_global() {
        let cli = Cli::parse_from(["formulary", "analyze", "x", "--session", "s1"]);
        assert_eq!(cli.global.session.as_deref(), Some("s1"));
    }
}
