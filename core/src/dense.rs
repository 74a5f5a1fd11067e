use crate::corpus::{Corpus, DocId, EmbeddingSnapshot};
use crate::error::EngineError;
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::HashMap;

/// External sentence-embedding model, invoked synchronously per query.
/// Implementations may block on model inference; failures are reported as
/// errors and the engine degrades to the next signal tier.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Array1<f32>, EngineError>;
}

/// Flat nearest-neighbor index over precomputed sentence embeddings, built
/// once from a snapshot and aligned to corpus document ids.
#[derive(Debug)]
pub struct EmbeddingIndex {
    doc_ids: Vec<DocId>,
    matrix: Array2<f32>,
    row_of: HashMap<DocId, usize>,
}

impl EmbeddingIndex {
    /// Align a `(codes, vectors)` snapshot with the corpus. Codes missing
    /// from the corpus (and ragged or empty vectors) are logged and
    /// skipped; returns `None` when nothing aligns.
    pub fn from_snapshot(snapshot: &EmbeddingSnapshot, corpus: &Corpus) -> Option<Self> {
        let dim = snapshot.vectors.iter().map(Vec::len).find(|&l| l > 0)?;
        let mut doc_ids = Vec::new();
        let mut rows: Vec<f32> = Vec::new();
        for (code, vector) in snapshot.codes.iter().zip(&snapshot.vectors) {
            let Some(doc_id) = corpus.id_of(code) else {
                tracing::warn!(code, "embedding snapshot references unknown course; dropped");
                continue;
            };
            if vector.len() != dim {
                tracing::warn!(code, got = vector.len(), expected = dim, "ragged embedding row; dropped");
                continue;
            }
            doc_ids.push(doc_id);
            rows.extend_from_slice(vector);
        }
        if doc_ids.is_empty() {
            return None;
        }
        let matrix = Array2::from_shape_vec((doc_ids.len(), dim), rows).ok()?;
        let row_of = doc_ids.iter().enumerate().map(|(row, &id)| (id, row)).collect();
        tracing::info!(rows = doc_ids.len(), dim, "built embedding index");
        Some(Self {
            doc_ids,
            matrix,
            row_of,
        })
    }

    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Stored vector for a document, if the snapshot covered it.
    pub fn vector_for(&self, doc_id: DocId) -> Option<ArrayView1<'_, f32>> {
        let row = *self.row_of.get(&doc_id)?;
        Some(self.matrix.row(row))
    }

    /// Cosine top-K against every stored vector, descending, ties by
    /// ascending document id.
    pub fn search(&self, query: &ArrayView1<f32>, top_k: usize) -> Vec<(DocId, f32)> {
        let mut scored: Vec<(DocId, f32)> = self
            .doc_ids
            .iter()
            .enumerate()
            .filter_map(|(row, &doc_id)| {
                let sim = cosine_similarity(query, &self.matrix.row(row));
                sim.is_finite().then_some((doc_id, sim))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        scored
    }

    /// Cosine similarity per covered document, for sub-score annotation.
    pub fn similarity_map(&self, query: &ArrayView1<f32>) -> HashMap<DocId, f32> {
        self.doc_ids
            .iter()
            .enumerate()
            .map(|(row, &doc_id)| (doc_id, cosine_similarity(query, &self.matrix.row(row))))
            .collect()
    }
}

pub fn cosine_similarity(a: &ArrayView1<f32>, b: &ArrayView1<f32>) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot = a.dot(b);
    let denom = a.dot(a).sqrt() * b.dot(b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CourseRecord;
    use ndarray::array;
    use std::collections::BTreeMap;

    fn corpus_with(codes: &[&str]) -> Corpus {
        let mut map = BTreeMap::new();
        for code in codes {
            map.insert(
                code.to_string(),
                CourseRecord {
                    description: format!("description of {code}"),
                    ..Default::default()
                },
            );
        }
        Corpus::assemble(map, HashMap::new(), &HashMap::new())
    }

    fn snapshot(codes: &[&str], vectors: &[&[f32]]) -> EmbeddingSnapshot {
        EmbeddingSnapshot {
            codes: codes.iter().map(|c| c.to_string()).collect(),
            vectors: vectors.iter().map(|v| v.to_vec()).collect(),
        }
    }

    #[test]
    fn nearest_neighbor_ordering() {
        let corpus = corpus_with(&["A", "B", "C"]);
        let snap = snapshot(
            &["A", "B", "C"],
            &[&[1.0, 0.0], &[0.9, 0.1], &[0.0, 1.0]],
        );
        let index = EmbeddingIndex::from_snapshot(&snap, &corpus).unwrap();
        let query = array![1.0, 0.0];
        let hits = index.search(&query.view(), 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, corpus.id_of("A").unwrap());
        assert_eq!(hits[1].0, corpus.id_of("B").unwrap());
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn unknown_codes_are_dropped() {
        let corpus = corpus_with(&["A"]);
        let snap = snapshot(&["A", "GHOST"], &[&[1.0, 0.0], &[0.0, 1.0]]);
        let index = EmbeddingIndex::from_snapshot(&snap, &corpus).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.vector_for(corpus.id_of("A").unwrap()).is_some());
    }

    #[test]
    fn empty_alignment_yields_no_index() {
        let corpus = corpus_with(&["A"]);
        let snap = snapshot(&["GHOST"], &[&[1.0, 0.0]]);
        assert!(EmbeddingIndex::from_snapshot(&snap, &corpus).is_none());
    }

    #[test]
    fn zero_vector_similarity_is_zero() {
        let a = array![0.0, 0.0];
        let b = array![1.0, 0.0];
        assert_eq!(cosine_similarity(&a.view(), &b.view()), 0.0);
    }

    #[test]
    fn mismatched_dims_score_zero() {
        let a = array![1.0, 0.0, 0.0];
        let b = array![1.0, 0.0];
        assert_eq!(cosine_similarity(&a.view(), &b.view()), 0.0);
    }
}
