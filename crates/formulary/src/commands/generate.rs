//! `formulary generate` -- run all five stages and summarize the result.

use anyhow::Result;
use formulary_pipeline::GenerationOutcome;

use crate::cli::QueryArgs;
use crate::context::RuntimeContext;
use crate::output::{accent, field, heading, list, muted, output_json, score};

/// Execute the `formulary generate` command.
pub fn run(ctx: &RuntimeContext, args: &QueryArgs) -> Result<()> {
    let services = ctx.services()?;
    let query = args.text();
    let outcome = services.pipeline().generate_formula(&query, ctx.session());

    if ctx.json {
        output_json(&outcome);
    } else {
        print_summary(&query, &outcome);
    }
    Ok(())
}

/// Formula first, then the figures a reader checks before trusting it.
/// `requested` is the text as typed, before retry resolution.
pub fn print_summary(requested: &str, outcome: &GenerationOutcome) {
    let Some(synthesis) = &outcome.synthesis else {
        println!("{}", muted("No formula was produced."));
        return;
    };

    if outcome.query != requested {
        println!("{}", muted(&format!("(retrying: {})", outcome.query)));
    }
    println!("{}", accent(&synthesis.primary_formula));
    println!();
    for (i, alternative) in synthesis.alternative_formulas.iter().enumerate() {
        field(&format!("alternative {}", i + 1), alternative, 14);
    }
    field("confidence", score(synthesis.confidence_score), 14);
    if let Some(testing) = &outcome.testing {
        field(
            "tests",
            format!(
                "{}/{} passed",
                testing.primary_result.passed_count, testing.primary_result.total_count
            ),
            14,
        );
        field("test score", score(testing.overall_score), 14);
    }
    println!();
    println!("{}", heading("Explanation"));
    println!("{}", synthesis.explanation.trim());
    if let Some(testing) = &outcome.testing {
        println!();
        list("Recommendations", &testing.recommendations);
    }
}
