use crate::corpus::{Corpus, DocId};
use crate::index::InvertedIndex;
use crate::stats::{compute_doc_norms, compute_idf};
use crate::tokenizer::normalize;
use std::collections::HashMap;

/// How many contributing terms to retain per hit for explainability.
const TOP_TERMS: usize = 5;

/// A lexical match with its cosine score and the terms that drove it.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub doc_id: DocId,
    pub score: f32,
    pub top_terms: Vec<String>,
}

/// TF-IDF cosine scorer over the inverted index. All fields are immutable
/// after construction.
#[derive(Debug)]
pub struct LexicalScorer {
    index: InvertedIndex,
    idf: HashMap<String, f32>,
    doc_norms: Vec<f32>,
}

impl LexicalScorer {
    pub fn build(corpus: &Corpus) -> Self {
        let index = InvertedIndex::build(corpus);
        let idf = compute_idf(&index, corpus.len());
        let doc_norms = compute_doc_norms(&index, &idf, corpus.len());
        Self {
            index,
            idf,
            doc_norms,
        }
    }

    /// Cosine-similarity search. Documents with a zero norm (or a zero
    /// query norm) are excluded rather than divided by, so the output never
    /// contains NaN or infinite scores. Ties break by ascending document id.
    pub fn search(&self, query: &str, limit: usize) -> Vec<LexicalHit> {
        let mut query_counts: HashMap<String, u32> = HashMap::new();
        for term in normalize(query) {
            *query_counts.entry(term).or_insert(0) += 1;
        }
        if query_counts.is_empty() {
            return Vec::new();
        }

        let mut query_norm = 0.0f32;
        for (term, count) in &query_counts {
            let w = *count as f32 * self.idf.get(term).copied().unwrap_or(0.0);
            query_norm += w * w;
        }
        let query_norm = query_norm.sqrt();
        if query_norm == 0.0 {
            return Vec::new();
        }

        // Dot-product contributions, accumulated only over shared terms.
        let mut dot: HashMap<DocId, f32> = HashMap::new();
        let mut contributions: HashMap<DocId, Vec<(&str, f32)>> = HashMap::new();
        for (term, count) in &query_counts {
            let (Some(&weight), Some(postings)) =
                (self.idf.get(term), self.index.postings(term))
            else {
                continue;
            };
            let query_w = *count as f32 * weight;
            for &(doc_id, tf) in postings {
                let contribution = query_w * tf as f32 * weight;
                *dot.entry(doc_id).or_insert(0.0) += contribution;
                contributions
                    .entry(doc_id)
                    .or_default()
                    .push((term.as_str(), contribution));
            }
        }

        let mut hits: Vec<LexicalHit> = dot
            .into_iter()
            .filter_map(|(doc_id, numerator)| {
                let doc_norm = self.doc_norms.get(doc_id as usize).copied().unwrap_or(0.0);
                let denominator = query_norm * doc_norm;
                if denominator == 0.0 {
                    return None;
                }
                let mut terms = contributions.remove(&doc_id).unwrap_or_default();
                terms.sort_by(|a, b| {
                    b.1.abs()
                        .partial_cmp(&a.1.abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                Some(LexicalHit {
                    doc_id,
                    score: numerator / denominator,
                    top_terms: terms
                        .into_iter()
                        .take(TOP_TERMS)
                        .map(|(t, _)| t.to_string())
                        .collect(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(limit);
        hits
    }

    pub fn num_terms(&self) -> usize {
        self.index.num_terms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CourseRecord;
    use std::collections::BTreeMap;

    fn scorer_for(courses: &[(&str, &str)]) -> (LexicalScorer, Corpus) {
        let mut map = BTreeMap::new();
        for (code, description) in courses {
            map.insert(
                code.to_string(),
                CourseRecord {
                    description: description.to_string(),
                    ..Default::default()
                },
            );
        }
        let corpus = Corpus::assemble(map, HashMap::new(), &HashMap::new());
        (LexicalScorer::build(&corpus), corpus)
    }

    #[test]
    fn python_query_ranks_python_course_first() {
        // Third course keeps document frequencies below N so idf stays
        // positive for the query terms.
        let (scorer, corpus) = scorer_for(&[
            ("CS1110", "intro to programming in python"),
            ("CS2110", "data structures and algorithms"),
            ("HIST101", "history of the roman empire"),
        ]);
        let hits = scorer.search("python programming", 10);
        assert!(!hits.is_empty());
        assert_eq!(corpus.get(hits[0].doc_id).unwrap().code, "CS1110");
    }

    #[test]
    fn non_matching_course_never_outranks_matching_one() {
        let (scorer, corpus) = scorer_for(&[
            ("CS1110", "intro to programming in python"),
            ("CS2110", "data structures and algorithms"),
        ]);
        let hits = scorer.search("python programming", 10);
        let rank_of = |code: &str| {
            hits.iter()
                .position(|h| corpus.get(h.doc_id).unwrap().code == code)
        };
        // CS2110 shares no query terms; it must never rank at or above
        // CS1110 (in a two-document corpus every idf is zero, so both may
        // legitimately be absent).
        match (rank_of("CS1110"), rank_of("CS2110")) {
            (Some(a), Some(b)) => assert!(a < b),
            (_, None) => {}
            (None, Some(_)) => panic!("CS2110 ranked while CS1110 did not"),
        }
    }

    #[test]
    fn scores_sorted_descending_without_nan() {
        let (scorer, _) = scorer_for(&[
            ("A", "python programming basics"),
            ("B", "python"),
            ("C", "programming languages survey"),
            ("D", ""),
        ]);
        let hits = scorer.search("python programming", 10);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits.iter().all(|h| h.score.is_finite()));
    }

    #[test]
    fn zero_norm_documents_are_excluded() {
        let (scorer, corpus) = scorer_for(&[("A", "python"), ("B", "the and of")]);
        let empty_id = corpus.id_of("B").unwrap();
        let hits = scorer.search("python", 10);
        assert!(hits.iter().all(|h| h.doc_id != empty_id));
    }

    #[test]
    fn degenerate_query_returns_empty() {
        let (scorer, _) = scorer_for(&[("A", "python")]);
        assert!(scorer.search("", 10).is_empty());
        assert!(scorer.search("the and of", 10).is_empty());
    }

    #[test]
    fn top_terms_are_capped_and_relevant() {
        let (scorer, _) = scorer_for(&[
            ("A", "python programming data structures recursion graphs trees"),
            ("B", "history of art"),
            ("C", "organic chemistry lab"),
        ]);
        let hits = scorer.search("python programming recursion graphs trees data", 10);
        let top = &hits[0].top_terms;
        assert!(top.len() <= 5);
        assert!(top.contains(&"python".to_string()) || top.contains(&"recursion".to_string()));
    }

    #[test]
    fn ties_break_by_document_id() {
        let (scorer, _) = scorer_for(&[("A", "python"), ("B", "python")]);
        let hits = scorer.search("python", 10);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].doc_id < hits[1].doc_id);
    }
}
