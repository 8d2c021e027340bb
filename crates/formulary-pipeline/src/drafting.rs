//! Assisted drafting: a single model call grounded in catalog documentation.
//!
//! Unlike the staged pipeline, the formula here is written by the model.
//! The reply is only checked statically.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use formulary_catalog::catalog::Catalog;
use formulary_catalog::search::SimilaritySearch;
use formulary_core::enums::FunctionCategory;
use formulary_core::formula::FormulaValidation;
use formulary_llm::CompletionService;
use formulary_llm::reasoning::strip_reasoning;

use crate::analyzer::{KeywordHeuristics, ResponseParser};
use crate::error::Result;

pub const DEFAULT_SNIPPETS: usize = 4;

const CONTEXT_SEPARATOR: &str = "\n---CONTEXT---\n";

/// Reply used when no documentation matches the request.
pub const NO_CONTEXT: &str = "I couldn't find relevant formula information for your request. \
     Could you please provide more specific details about the CRM formula you need? \
     For example, mention the fields, objects, or specific calculation you're trying to achieve.";

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap());

fn categories_prompt(query: &str) -> String {
    let names: Vec<String> = FunctionCategory::ALL.iter().map(|c| c.to_string()).collect();
    format!(
        "Which CRM formula function categories does this request need?\n\
         Choose from: {}.\n\
         Reply with a comma-separated list of categories only.\n\n\
         Request: {query}",
        names.join(", ")
    )
}

fn formula_prompt(context: &str, query: &str) -> String {
    format!(
        "# You are a CRM formula expert with access to conversation history.\n\n\
         # Do not use your prior knowledge of Salesforce syntax or functions.\n\
         # Instead, use only the information and field definitions provided in the context to generate a formula.\n\n\
         Based on the following context and our conversation, help with this formula question:\n\
         Context: {context}\n\n\
         User Question: {query}\n\n\
         ## Instructions:\n\
         ### - If this is a retry attempt, provide a different approach\n\
         ### - Provide the exact formula with clear explanation\n\
         ### - If you cannot find relevant context, clearly state what information you need\n\n\
         # Important:\n\
         ## - Please provide the exact formula without any additional context or clarification\n\
         ## - Do not explain anything in detail, just provide the formula\n\
         ## - You Should not use your own words, just use the words from the original question\n\
         ## - You should use the context provided by the system\n"
    )
}

/// Reads category tags out of a free-text reply, keeping first mentions.
fn parse_categories(reply: &str) -> Vec<FunctionCategory> {
    let mut out = Vec::new();
    for tag in reply.split([',', '\n', ';']) {
        let tag = tag.trim().trim_matches(|c: char| c == '-' || c == '*' || c == '.').trim();
        if let Some(category) = FunctionCategory::parse_tag(tag) {
            if !out.contains(&category) {
                out.push(category);
            }
        }
    }
    out
}

/// The formula line of a reply: the first non-blank line, looking inside a
/// code fence when there is one.
fn formula_line(reply: &str) -> Option<String> {
    let body = FENCE_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str());
    body.lines()
        .map(|l| l.trim().trim_matches('`').trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Result of one drafting request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub query: String,
    pub categories: Vec<FunctionCategory>,
    /// Documentation passages the prompt was grounded in.
    pub context_documents: usize,
    /// The full reply, reasoning removed.
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<FormulaValidation>,
}

pub struct Drafter {
    service: Arc<dyn CompletionService>,
    catalog: Arc<Catalog>,
    search: Option<Arc<dyn SimilaritySearch>>,
    snippets: usize,
}

impl Drafter {
    pub fn new(service: Arc<dyn CompletionService>, catalog: Arc<Catalog>) -> Self {
        Self {
            service,
            catalog,
            search: None,
            snippets: DEFAULT_SNIPPETS,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SimilaritySearch>, snippets: usize) -> Self {
        self.search = Some(search);
        self.snippets = snippets;
        self
    }

    /// Categories the request needs, from the model or, failing that, from
    /// keywords in the request.
    pub fn categories(&self, query: &str, session: Option<&str>) -> Vec<FunctionCategory> {
        let from_model = match self.service.complete(&categories_prompt(query), session) {
            Ok(reply) => parse_categories(&strip_reasoning(&reply)),
            Err(e) => {
                warn!(error = %e, "category request failed, using keywords");
                Vec::new()
            }
        };
        if !from_model.is_empty() {
            return from_model;
        }
        KeywordHeuristics
            .parse(query, "")
            .map(|a| a.function_categories)
            .unwrap_or_default()
    }

    /// Documentation passages for the prompt: search hits first, then the
    /// catalog entries of each category.
    fn context(&self, query: &str, categories: &[FunctionCategory]) -> Vec<String> {
        let mut documents = Vec::new();
        let mut covered = BTreeSet::new();
        if let Some(search) = &self.search {
            for snippet in search.search(query, self.snippets) {
                if let Some(function) = snippet.metadata.get("function") {
                    covered.insert(function.clone());
                }
                documents.push(snippet.text);
            }
        }
        for category in categories {
            for (name, def) in self.catalog.by_category(*category) {
                if covered.insert(name.to_string()) {
                    documents.push(format!("{}\n{}", def.signature(name), def.description));
                }
            }
        }
        documents
    }

    fn known_functions(&self) -> BTreeSet<String> {
        self.catalog
            .functions()
            .map(|(name, _)| name.to_ascii_uppercase())
            .collect()
    }

    pub fn draft(&self, query: &str, session: Option<&str>) -> Result<Draft> {
        let categories = self.categories(query, session);
        let documents = self.context(query, &categories);
        debug!(categories = ?categories, documents = documents.len(), "drafting context gathered");

        if documents.is_empty() {
            warn!(session = session.unwrap_or("-"), "no documentation found for drafting request");
            return Ok(Draft {
                query: query.to_string(),
                categories,
                context_documents: 0,
                reply: NO_CONTEXT.to_string(),
                formula: None,
                validation: None,
            });
        }

        let prompt = formula_prompt(&documents.join(CONTEXT_SEPARATOR), query);
        let reply = strip_reasoning(&self.service.complete(&prompt, session)?)
            .trim()
            .to_string();
        let formula = formula_line(&reply);
        let validation = formula
            .as_deref()
            .map(|f| FormulaValidation::check("Draft", f, &self.known_functions()));
        info!(
            session = session.unwrap_or("-"),
            formula = formula.as_deref().unwrap_or("-"),
            valid = validation.as_ref().is_some_and(|v| v.valid),
            "draft complete"
        );

        Ok(Draft {
            query: query.to_string(),
            categories,
            context_documents: documents.len(),
            reply,
            formula,
            validation,
        })
    }
}

impl std::fmt::Debug for Drafter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drafter")
            .field("functions", &self.catalog.len())
            .field("search", &self.search.is_some())
            .field("snippets", &self.snippets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Scripted;
    use formulary_catalog::search::KeywordSearch;
    use formulary_catalog::source::{CatalogSource, EmbeddedCatalog};
    use pretty_assertions::assert_eq;

    fn catalog() -> Arc<Catalog> {
        Arc::new(EmbeddedCatalog.load().unwrap())
    }

    fn drafting_service() -> Arc<Scripted> {
        Arc::new(Scripted::new(|prompt| {
            if prompt.starts_with("Which CRM formula") {
                Ok("Math, Logical".into())
            } else {
                Ok("<think>percent of amount</think>\n```\nMULTIPLY(sales_amount, 0.05)\n```".into())
            }
        }))
    }

    #[test]
    fn drafts_grounded_formula() {
        let service = drafting_service();
        let drafter = Drafter::new(service.clone(), catalog());
        let draft = drafter.draft("5% commission on sales_amount", Some("d1")).unwrap();

        assert_eq!(draft.categories, vec![FunctionCategory::Math, FunctionCategory::Logical]);
        assert_eq!(draft.formula.as_deref(), Some("MULTIPLY(sales_amount, 0.05)"));
        let validation = draft.validation.unwrap();
        assert!(validation.valid);
        assert!(validation.warnings.is_empty());
        assert!(!draft.reply.contains("<think>"));

        let prompts = service.prompts();
        let formula_prompt = prompts.last().unwrap();
        assert!(formula_prompt.contains("User Question: 5% commission on sales_amount"));
        assert!(formula_prompt.contains("---CONTEXT---"));
        assert!(formula_prompt.contains("MULTIPLY("));
    }

    #[test]
    fn search_hits_come_first() {
        let catalog = catalog();
        let search = Arc::new(KeywordSearch::from_catalog(&catalog));
        let drafter = Drafter::new(drafting_service(), catalog).with_search(search, 2);
        let documents = drafter.context("percentage commission", &[]);
        assert_eq!(documents.len(), 2);
        assert!(documents.iter().any(|d| d.starts_with("PERCENTAGE (")));

        let with_math = drafter.context("percentage commission", &[FunctionCategory::Math]);
        let percentage = with_math.iter().filter(|d| d.starts_with("PERCENTAGE")).count();
        assert_eq!(percentage, 1);
    }

    #[test]
    fn falls_back_to_keyword_categories() {
        let drafter = Drafter::new(Arc::new(Scripted::replying("no idea")), catalog());
        let categories = drafter.categories("format the date of the order", None);
        assert!(categories.contains(&FunctionCategory::DateTime));
    }

    #[test]
    fn no_documentation_means_no_model_call() {
        let service = Arc::new(Scripted::replying("Math"));
        let drafter = Drafter::new(service.clone(), Arc::new(Catalog::empty()));
        let draft = drafter.draft("anything", None).unwrap();
        assert_eq!(draft.reply, NO_CONTEXT);
        assert_eq!(draft.formula, None);
        assert_eq!(service.prompts().len(), 1);
    }

    #[test]
    fn completion_failure_is_an_error() {
        let drafter = Drafter::new(Arc::new(Scripted::failing()), catalog());
        assert!(drafter.draft("sum the amounts", None).is_err());
    }

    #[test]
    fn reply_parsing() {
        assert_eq!(
            parse_categories("- Math\n- Date/Time\n- math\n- Unknown"),
            vec![FunctionCategory::Math, FunctionCategory::DateTime]
        );
        assert_eq!(formula_line("\n  `ROUND(x, 2)`  \nexplanation"), Some("ROUND(x, 2)".into()));
        assert_eq!(formula_line("   \n"), None);
    }
}
