//! Description overlap scoring and the query previewer.
//!
//! A query that overlaps a guide description at [`STRONG_MATCH`] or above
//! mentions that guide explicitly. [`probe`] previews this for a sample query
//! against every guide, and also reports mentions by name or alias.

use std::fmt::Write as _;

use serde::Serialize;

use crate::models::{Category, GuideDocument};
use crate::registry::GuideRegistry;
use crate::signals::mention_signals;

/// Overlap at which a query mentions a guide through its description.
pub const STRONG_MATCH: f64 = 0.5;

/// Overlap at which a query is reported as a weak match.
const WEAK_MATCH: f64 = 0.2;

/// How well a guide description matches a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMatch {
    /// At least half of the query words appear in the description.
    Strong,
    /// At least a fifth of the query words appear.
    Weak,
    None,
}

/// Probe outcome for one guide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub id: String,
    pub category: Category,
    pub description: String,
    /// Fraction of query words found in the description.
    pub score: f64,
    pub query_match: QueryMatch,
    /// Whether the query mentions this guide by name or description, so it
    /// would be selected.
    pub mentioned: bool,
}

/// Score `query` against every language and framework guide in the registry.
///
/// Results are ordered by score (best first), then by id.
#[must_use]
pub fn probe(registry: &GuideRegistry, query: &str) -> Vec<ProbeResult> {
    let mentioned: Vec<String> = mention_signals(query, registry)
        .into_iter()
        .map(|s| s.value)
        .collect();

    let mut results: Vec<ProbeResult> = registry
        .iter()
        .filter(|doc| matches!(doc.category, Category::Language | Category::Framework))
        .map(|doc| {
            let score = query_overlap(query, &doc.description);
            ProbeResult {
                id: doc.id.clone(),
                category: doc.category,
                description: doc.description.clone(),
                score,
                query_match: classify(score),
                mentioned: is_mentioned(doc, &mentioned),
            }
        })
        .collect();
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.mentioned.cmp(&a.mentioned))
            .then_with(|| a.id.cmp(&b.id))
    });
    results
}

fn is_mentioned(doc: &GuideDocument, mentioned: &[String]) -> bool {
    let name = match doc.category {
        Category::Framework => doc.framework.as_deref(),
        _ => doc.language.as_deref(),
    };
    name.is_some_and(|n| mentioned.iter().any(|m| m == n))
}

/// Fraction of query words (longer than two characters) that appear in the
/// description, case-insensitively.
#[must_use]
pub fn query_overlap(query: &str, description: &str) -> f64 {
    let query_words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let desc_lower = description.to_lowercase();
    let hits = query_words
        .iter()
        .filter(|w| desc_lower.contains(w.as_str()))
        .count();
    hits as f64 / query_words.len() as f64
}

fn classify(score: f64) -> QueryMatch {
    if score >= STRONG_MATCH {
        QueryMatch::Strong
    } else if score >= WEAK_MATCH {
        QueryMatch::Weak
    } else {
        QueryMatch::None
    }
}

/// Format probe results as human-readable text.
#[must_use]
pub fn format_probe_results(query: &str, results: &[ProbeResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query: \"{query}\"");
    if results.is_empty() {
        out.push_str("No language or framework guides registered.\n");
        return out;
    }
    out.push('\n');
    for r in results {
        let label = match r.query_match {
            QueryMatch::Strong => "STRONG",
            QueryMatch::Weak => "WEAK",
            QueryMatch::None => "NONE",
        };
        let selected = if r.mentioned { "  [selected by mention]" } else { "" };
        let _ = writeln!(
            out,
            "{:<24} {:<10} {label:<6} {:.2}{selected}",
            r.id, r.category, r.score
        );
    }
    out
}
