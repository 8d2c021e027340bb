//! `formulary catalog` -- browse the function catalog.

use anyhow::{Result, bail};
use formulary_catalog::search::SimilaritySearch;
use formulary_catalog::{Catalog, CatalogStore};
use formulary_core::definition::FunctionDefinition;
use serde::Serialize;

use crate::cli::{CatalogArgs, CatalogCommands};
use crate::context::RuntimeContext;
use crate::output::{accent, field, heading, list, output_json, output_table};

/// A function as printed by `list`, `show` and `search`.
#[derive(Serialize)]
struct FunctionView<'a> {
    name: &'a str,
    signature: String,
    #[serde(flatten)]
    definition: &'a FunctionDefinition,
}

impl<'a> FunctionView<'a> {
    fn new(name: &'a str, definition: &'a FunctionDefinition) -> Self {
        Self {
            name,
            signature: definition.signature(name),
            definition,
        }
    }
}

/// Execute the `formulary catalog` command.
pub fn run(ctx: &RuntimeContext, args: &CatalogArgs) -> Result<()> {
    let services = ctx.services()?;
    let store: &CatalogStore = &services.catalog;
    let catalog = store.snapshot();

    match &args.command {
        CatalogCommands::List { category } => {
            let functions = match category {
                Some(category) => catalog.by_category(*category),
                None => catalog.functions().collect(),
            };
            print_functions(ctx, &functions);
        }

        CatalogCommands::Show { name } => {
            let Some((name, definition)) = catalog.entry(name) else {
                bail!("no function named '{name}' in the catalog");
            };
            if ctx.json {
                output_json(&FunctionView::new(name, definition));
            } else {
                print_definition(&catalog, name, definition);
            }
        }

        CatalogCommands::Search { text, ranked, limit } => {
            let text = text.join(" ");
            if *ranked {
                let hits = services.search.search(&text, *limit);
                if ctx.json {
                    output_json(&hits);
                } else if hits.is_empty() {
                    println!("No matches for '{text}'.");
                } else {
                    for hit in hits {
                        println!("{} {}", accent(&format!("[{:.2}]", hit.score)), hit.text);
                        println!();
                    }
                }
            } else {
                let functions = catalog.search(&text);
                if !ctx.json && functions.is_empty() {
                    println!("No matches for '{text}'.");
                } else {
                    print_functions(ctx, &functions);
                }
            }
        }

        CatalogCommands::Stats => {
            let stats = catalog.stats();
            if ctx.json {
                output_json(&stats);
            } else {
                println!("{}", heading(&format!("{} {}", stats.system, stats.version)));
                field("source", store.source(), 10);
                field("functions", stats.total_functions, 10);
                field("patterns", stats.patterns, 10);
                println!();
                let rows: Vec<Vec<String>> = stats
                    .by_category
                    .iter()
                    .map(|(category, count)| vec![category.to_string(), count.to_string()])
                    .collect();
                output_table(&["CATEGORY", "FUNCTIONS"], &rows);
            }
        }
    }
    Ok(())
}

fn print_functions(ctx: &RuntimeContext, functions: &[(&str, &FunctionDefinition)]) {
    if ctx.json {
        let views: Vec<FunctionView> = functions
            .iter()
            .map(|(name, def)| FunctionView::new(name, def))
            .collect();
        output_json(&views);
        return;
    }
    let rows: Vec<Vec<String>> = functions
        .iter()
        .map(|(name, def)| {
            vec![
                name.to_string(),
                def.category.to_string(),
                def.return_type.to_string(),
                def.description.clone(),
            ]
        })
        .collect();
    output_table(&["NAME", "CATEGORY", "RETURNS", "DESCRIPTION"], &rows);
}

fn print_definition(catalog: &Catalog, name: &str, def: &FunctionDefinition) {
    println!("{}", accent(&def.signature(name)));
    println!();
    if !def.description.is_empty() {
        println!("{}\n", def.description);
    }
    field("category", def.category, 10);
    field("returns", def.return_type, 10);
    for param in &def.parameters {
        let required = if param.required { "" } else { " (optional)" };
        field(
            &param.name,
            format!("{}{required} {}", param.value_type, param.description),
            10,
        );
    }
    println!();
    list("Examples", &def.examples);
    list("Use cases", &def.use_cases);
    let related: Vec<String> = def
        .related_functions
        .iter()
        .map(|r| match catalog.function(r) {
            Some(_) => r.clone(),
            None => format!("{r} (not in catalog)"),
        })
        .collect();
    list("Related", &related);
}
