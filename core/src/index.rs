use crate::corpus::{Corpus, DocId};
use std::collections::HashMap;

/// Term -> posting list of (document id, term frequency). Built once at
/// startup and read-only while serving; a term appears at most once per
/// document and every stored frequency is >= 1.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<(DocId, u32)>>,
    num_docs: usize,
}

impl InvertedIndex {
    /// Build the index from every document's filtered token sequence.
    /// Runs in O(total filtered tokens); document ids come from the corpus
    /// arena, so posting order within a term follows corpus order.
    pub fn build(corpus: &Corpus) -> Self {
        let mut postings: HashMap<String, Vec<(DocId, u32)>> = HashMap::new();
        for doc in corpus.docs() {
            let mut counts: HashMap<&str, u32> = HashMap::new();
            for token in &doc.tokens {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings.entry(term.to_string()).or_default().push((doc.id, tf));
            }
        }
        tracing::info!(
            num_terms = postings.len(),
            num_docs = corpus.len(),
            "built inverted index"
        );
        Self {
            postings,
            num_docs: corpus.len(),
        }
    }

    pub fn postings(&self, term: &str) -> Option<&[(DocId, u32)]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[(DocId, u32)])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CourseRecord;
    use std::collections::{BTreeMap, HashMap};

    fn tiny_corpus() -> Corpus {
        let mut courses = BTreeMap::new();
        courses.insert(
            "CS1110".to_string(),
            CourseRecord {
                description: "intro to programming in python python".to_string(),
                title: "Intro Programming".to_string(),
                ..Default::default()
            },
        );
        courses.insert(
            "CS2110".to_string(),
            CourseRecord {
                description: "data structures and algorithms".to_string(),
                title: "Data Structures".to_string(),
                ..Default::default()
            },
        );
        Corpus::assemble(courses, HashMap::new(), &HashMap::new())
    }

    #[test]
    fn term_frequency_counts_per_document() {
        let index = InvertedIndex::build(&tiny_corpus());
        let postings = index.postings("python").unwrap();
        assert_eq!(postings, &[(0, 2)]);
    }

    #[test]
    fn term_appears_once_per_posting_list() {
        let index = InvertedIndex::build(&tiny_corpus());
        for (_, postings) in index.terms() {
            let mut ids: Vec<_> = postings.iter().map(|(d, _)| *d).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), postings.len());
            assert!(postings.iter().all(|(_, tf)| *tf >= 1));
        }
    }

    #[test]
    fn stopwords_never_indexed() {
        let index = InvertedIndex::build(&tiny_corpus());
        assert!(index.postings("to").is_none());
        assert!(index.postings("and").is_none());
    }
}
