//! `formulary research` -- fan a topic out into questions and print a
//! Markdown report.

use anyhow::{Context, Result, bail};
use formulary_config::Provider;

use crate::cli::ResearchArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `formulary research` command.
pub fn run(ctx: &RuntimeContext, args: &ResearchArgs) -> Result<()> {
    let services = ctx.services()?;
    if services.config.llm.provider == Provider::Offline {
        bail!("research needs a completion service; set llm.provider to 'openai'");
    }

    let mut researcher = services.researcher();
    if let Some(questions) = args.questions {
        researcher = researcher.with_questions(questions);
    }
    let topic = args.text();
    let report = researcher
        .research(&topic)
        .with_context(|| format!("research on '{topic}' failed"))?;

    if ctx.json {
        output_json(&report);
    } else {
        println!("{}", report.render());
    }
    Ok(())
}
