//! Documentation lookup used to give the completion service context.
//!
//! Results are advisory text; nothing downstream parses them.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::catalog::Catalog;

/// A ranked piece of documentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub text: String,
    pub score: f64,
    /// Tags such as `document_type`, `category` and `function`.
    pub metadata: BTreeMap<String, String>,
}

/// Ranked text retrieval over documentation.
pub trait SimilaritySearch: Send + Sync {
    /// Returns at most `top_k` snippets, best first.
    fn search(&self, query: &str, top_k: usize) -> Vec<Snippet>;
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "when", "then", "else", "than",
    "are", "is", "of", "to", "a", "an", "in", "on", "as", "by", "be", "it", "or", "if",
];

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .map(str::to_ascii_lowercase)
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

#[derive(Debug, Clone)]
struct Document {
    text: String,
    tokens: BTreeSet<String>,
    metadata: BTreeMap<String, String>,
}

impl Document {
    fn new(text: String, tags: &[(&str, &str)]) -> Self {
        Self {
            tokens: tokens(&text),
            text,
            metadata: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Token-overlap search over catalog functions and patterns.
#[derive(Debug, Clone, Default)]
pub struct KeywordSearch {
    documents: Vec<Document>,
}

impl KeywordSearch {
    /// Indexes every function and common pattern of `catalog`.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut documents = Vec::new();
        for (name, def) in catalog.functions() {
            let mut text = format!(
                "{name} ({}): {}\nSyntax: {}",
                def.category,
                def.description,
                def.signature(name)
            );
            if !def.examples.is_empty() {
                text.push_str(&format!("\nExamples: {}", def.examples.join("; ")));
            }
            if !def.use_cases.is_empty() {
                text.push_str(&format!("\nUse cases: {}", def.use_cases.join("; ")));
            }
            documents.push(Document::new(
                text,
                &[
                    ("document_type", "function_reference"),
                    ("category", def.category.as_str()),
                    ("function", name),
                ],
            ));
        }
        for (name, pattern) in catalog.patterns() {
            let text = match pattern {
                serde_json::Value::Object(fields) => {
                    let describe = |key: &str| {
                        fields
                            .get(key)
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string()
                    };
                    format!(
                        "Pattern {name}: {}\nExample: {}",
                        describe("description"),
                        describe("example")
                    )
                }
                other => format!("Pattern {name}: {other}"),
            };
            documents.push(Document::new(
                text,
                &[("document_type", "pattern_reference"), ("pattern", name)],
            ));
        }
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl SimilaritySearch for KeywordSearch {
    fn search(&self, query: &str, top_k: usize) -> Vec<Snippet> {
        let wanted = tokens(query);
        if wanted.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let mut scored: Vec<Snippet> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let overlap = doc.tokens.intersection(&wanted).count();
                (overlap > 0).then(|| Snippet {
                    text: doc.text.clone(),
                    score: overlap as f64 / wanted.len() as f64,
                    metadata: doc.metadata.clone(),
                })
            })
            .collect();
        // Stable: equal scores keep index order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        scored
    }
}

/// Joins snippets into one context block for a prompt.
pub fn context_block(snippets: &[Snippet]) -> String {
    snippets
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CatalogSource, EmbeddedCatalog};
    use pretty_assertions::assert_eq;

    fn index() -> KeywordSearch {
        KeywordSearch::from_catalog(&EmbeddedCatalog.load().unwrap())
    }

    #[test]
    fn indexes_functions_and_patterns() {
        let search = index();
        assert_eq!(search.len(), 51 + 4);
    }

    #[test]
    fn ranks_best_overlap_first() {
        let hits = index().search("commission percentage of sales", 3);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].metadata["function"], "PERCENTAGE");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits.len() <= 3);
    }

    #[test]
    fn patterns_are_tagged() {
        let hits = index().search("default when field empty null guard", 10);
        assert!(
            hits.iter()
                .any(|h| h.metadata.get("document_type").map(String::as_str) == Some("pattern_reference"))
        );
    }

    #[test]
    fn empty_query_finds_nothing() {
        assert!(index().search("the and of", 5).is_empty());
        assert!(index().search("round", 0).is_empty());
    }

    #[test]
    fn context_block_joins_text() {
        let snippets = vec![
            Snippet { text: "a".into(), score: 1.0, metadata: BTreeMap::new() },
            Snippet { text: "b".into(), score: 0.5, metadata: BTreeMap::new() },
        ];
        assert_eq!(context_block(&snippets), "a\n\nb");
    }
}
