use crate::corpus::{Corpus, DocId};
use serde::Serialize;
use std::collections::HashSet;

/// Per-signal sub-scores attached to a result for transparency. A missing
/// value means the signal was unavailable, not that it scored zero.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SubScores {
    pub lexical: Option<f32>,
    pub latent: Option<f32>,
    pub dense: Option<f32>,
    pub title: Option<f32>,
    pub sentiment: Option<f32>,
}

/// One ranked course. Lives for a single response.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub code: String,
    pub title: String,
    pub score: f32,
    /// Top contributing lexical terms, when the lexical signal is present.
    pub top_terms: Vec<String>,
    /// Latent topic words shared with the description, when available.
    pub topic_words: Vec<String>,
    pub sub_scores: SubScores,
}

/// Collapse near-duplicate course listings (same description, different
/// section or offering) and cut to the requested length. Results must
/// already be in final rank order; the first occurrence of a description
/// wins.
pub fn dedup_and_truncate(
    results: Vec<ScoredResult>,
    corpus: &Corpus,
    top_k: usize,
) -> Vec<ScoredResult> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(top_k.min(results.len()));
    for result in results {
        let Some(doc) = corpus.get(result.doc_id) else {
            tracing::warn!(doc_id = result.doc_id, "result references document outside corpus; dropped");
            continue;
        };
        if !seen.insert(normalized_description(&doc.description)) {
            continue;
        }
        merged.push(result);
        if merged.len() == top_k {
            break;
        }
    }
    merged
}

/// Case- and whitespace-insensitive description key for deduplication.
fn normalized_description(description: &str) -> String {
    description
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
