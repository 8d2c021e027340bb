//! `formulary analyze|map|select|synthesize|test` -- run the pipeline up to
//! one stage and print that stage's artifact.

use anyhow::{Result, anyhow};
use formulary_pipeline::GenerationOutcome;
use formulary_pipeline::pipeline::Stage;

use crate::cli::QueryArgs;
use crate::commands::render;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute one of the per-stage commands.
pub fn run(ctx: &RuntimeContext, args: &QueryArgs, last: Stage) -> Result<()> {
    let services = ctx.services()?;
    let outcome = services
        .pipeline()
        .run_until(&args.text(), last, ctx.session());

    if ctx.json {
        emit_json(&outcome, last)
    } else {
        emit_human(&outcome, last)
    }
}

fn missing(stage: Stage) -> anyhow::Error {
    anyhow!("pipeline stopped before the {stage:?} stage")
}

fn emit_json(outcome: &GenerationOutcome, last: Stage) -> Result<()> {
    match last {
        Stage::Analyze => output_json(&outcome.analysis),
        Stage::Map => output_json(outcome.mapping.as_ref().ok_or_else(|| missing(last))?),
        Stage::Select => output_json(outcome.selection.as_ref().ok_or_else(|| missing(last))?),
        Stage::Synthesize => output_json(outcome.synthesis.as_ref().ok_or_else(|| missing(last))?),
        Stage::Test => output_json(outcome.testing.as_ref().ok_or_else(|| missing(last))?),
    }
    Ok(())
}

fn emit_human(outcome: &GenerationOutcome, last: Stage) -> Result<()> {
    match last {
        Stage::Analyze => render::analysis(&outcome.analysis),
        Stage::Map => render::mapping(outcome.mapping.as_ref().ok_or_else(|| missing(last))?),
        Stage::Select => render::selection(outcome.selection.as_ref().ok_or_else(|| missing(last))?),
        Stage::Synthesize => {
            render::synthesis(outcome.synthesis.as_ref().ok_or_else(|| missing(last))?)
        }
        Stage::Test => render::testing(outcome.testing.as_ref().ok_or_else(|| missing(last))?),
    }
    Ok(())
}
