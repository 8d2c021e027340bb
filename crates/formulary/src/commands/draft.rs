//! `formulary draft` -- one grounded model call instead of the five stages.

use anyhow::{Context, Result};

use crate::cli::QueryArgs;
use crate::context::RuntimeContext;
use crate::output::{accent, field, muted, output_json, pass_fail};

/// Execute the `formulary draft` command.
pub fn run(ctx: &RuntimeContext, args: &QueryArgs) -> Result<()> {
    let services = ctx.services()?;
    let draft = services
        .drafter()
        .draft(&args.text(), ctx.session())
        .context("drafting failed")?;

    if ctx.json {
        output_json(&draft);
        return Ok(());
    }

    match &draft.formula {
        Some(formula) => println!("{}\n", accent(formula)),
        None => println!("{}\n", muted("No formula found in the reply.")),
    }
    println!("{}", draft.reply);
    println!();
    let categories: Vec<String> = draft.categories.iter().map(ToString::to_string).collect();
    field("categories", categories.join(", "), 10);
    field("context", format!("{} documents", draft.context_documents), 10);
    if let Some(validation) = &draft.validation {
        field("valid", pass_fail(validation.valid), 10);
        for problem in validation.errors.iter().chain(&validation.warnings) {
            println!("  - {problem}");
        }
    }
    Ok(())
}
