use crate::index::InvertedIndex;
use std::collections::HashMap;

/// Inverse document frequency per indexed term: `log2(N / (1 + df))`.
/// Values go negative for terms present in most documents; that is part of
/// the weighting scheme, not an error.
pub fn compute_idf(index: &InvertedIndex, num_docs: usize) -> HashMap<String, f32> {
    let n = num_docs as f32;
    index
        .terms()
        .map(|(term, postings)| {
            let df = postings.len() as f32;
            (term.to_string(), (n / (1.0 + df)).log2())
        })
        .collect()
}

/// Euclidean norm of each document's TF-IDF vector, indexed by document id.
/// Only terms that survived into the IDF table contribute; a zero norm marks
/// a document with no scorable terms.
pub fn compute_doc_norms(
    index: &InvertedIndex,
    idf: &HashMap<String, f32>,
    num_docs: usize,
) -> Vec<f32> {
    let mut norms = vec![0.0f32; num_docs];
    for (term, postings) in index.terms() {
        if let Some(&weight) = idf.get(term) {
            for &(doc_id, tf) in postings {
                let w = tf as f32 * weight;
                norms[doc_id as usize] += w * w;
            }
        }
    }
    for n in &mut norms {
        *n = n.sqrt();
    }
    norms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Corpus, CourseRecord};
    use std::collections::BTreeMap;

    fn corpus_of(descriptions: &[&str]) -> Corpus {
        let mut courses = BTreeMap::new();
        for (i, d) in descriptions.iter().enumerate() {
            courses.insert(
                format!("C{i:04}"),
                CourseRecord {
                    description: d.to_string(),
                    ..Default::default()
                },
            );
        }
        Corpus::assemble(courses, HashMap::new(), &HashMap::new())
    }

    #[test]
    fn idf_matches_formula() {
        let corpus = corpus_of(&["python programming", "python networks", "databases"]);
        let index = InvertedIndex::build(&corpus);
        let idf = compute_idf(&index, corpus.len());
        // "python" in 2 of 3 docs: log2(3 / 3) == 0.
        assert!((idf["python"] - 0.0).abs() < 1e-6);
        // "databases" in 1 of 3: log2(3 / 2).
        assert!((idf["databases"] - (3.0f32 / 2.0).log2()).abs() < 1e-6);
    }

    #[test]
    fn idf_decreases_with_document_frequency() {
        let corpus = corpus_of(&[
            "alpha rare",
            "alpha common shared",
            "alpha common shared extra",
            "alpha common",
        ]);
        let index = InvertedIndex::build(&corpus);
        let idf = compute_idf(&index, corpus.len());
        assert!(idf["rare"] > idf["shared"]);
        assert!(idf["shared"] > idf["alpha"]);
    }

    #[test]
    fn idf_can_be_negative_for_ubiquitous_terms() {
        let corpus = corpus_of(&["python", "python", "python"]);
        let index = InvertedIndex::build(&corpus);
        let idf = compute_idf(&index, corpus.len());
        // df == N: log2(N / (N + 1)) < 0.
        assert!(idf["python"] < 0.0);
    }

    #[test]
    fn norms_are_nonnegative_and_zero_for_empty_docs() {
        let corpus = corpus_of(&["python programming", "", "the and of"]);
        let index = InvertedIndex::build(&corpus);
        let idf = compute_idf(&index, corpus.len());
        let norms = compute_doc_norms(&index, &idf, corpus.len());
        assert_eq!(norms.len(), 3);
        assert!(norms.iter().all(|n| *n >= 0.0));
        assert!(norms[0] > 0.0);
        assert_eq!(norms[1], 0.0);
        // All stop-words: nothing survives tokenization.
        assert_eq!(norms[2], 0.0);
    }
}
