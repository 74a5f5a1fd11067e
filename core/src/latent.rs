use crate::corpus::{Corpus, DocId};
use crate::tokenizer::normalize;
use ndarray::{Array1, Array2};
use std::collections::{HashMap, HashSet};

/// Deterministic seed for the randomized SVD range finder.
const SEED: u64 = 0x9E37_79B9_7F4A_7C15;
/// Subspace (power) iterations for the range finder.
const POWER_ITERATIONS: usize = 2;
/// Oversampling columns beyond the requested rank.
const OVERSAMPLE: usize = 8;

/// Latent-semantic model: a TF-IDF weighting transform fitted over all
/// document texts, reduced to a fixed number of latent dimensions by
/// truncated SVD. Documents live as rows of `A·V`; queries fold in as
/// `q·V` through the same transform.
#[derive(Debug)]
pub struct LatentModel {
    vocab: Vec<String>,
    term_ids: HashMap<String, usize>,
    /// Smoothed idf weight per vocabulary term.
    weights: Vec<f32>,
    /// Right singular vectors, one row per term, `dims` columns.
    term_coords: Array2<f32>,
    /// Reduced document coordinates, one row per document.
    doc_coords: Array2<f32>,
    dims: usize,
}

impl LatentModel {
    /// Fit the transform and factorization over the corpus. Returns `None`
    /// when there is nothing to factor (empty corpus or vocabulary).
    pub fn build(corpus: &Corpus, requested_dims: usize) -> Option<Self> {
        let n_docs = corpus.len();
        if n_docs == 0 {
            return None;
        }

        let mut vocab: Vec<String> = {
            let mut set: HashSet<&str> = HashSet::new();
            for doc in corpus.docs() {
                for token in &doc.tokens {
                    set.insert(token);
                }
            }
            set.into_iter().map(str::to_string).collect()
        };
        vocab.sort_unstable();
        if vocab.is_empty() {
            return None;
        }
        let term_ids: HashMap<String, usize> = vocab
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        // Smoothed idf keeps every weight positive, which the reduced space
        // needs; the lexical scorer keeps its signed formula.
        let mut df = vec![0u32; vocab.len()];
        for doc in corpus.docs() {
            let mut seen: HashSet<usize> = HashSet::new();
            for token in &doc.tokens {
                if let Some(&tid) = term_ids.get(token) {
                    if seen.insert(tid) {
                        df[tid] += 1;
                    }
                }
            }
        }
        let weights: Vec<f32> = df
            .iter()
            .map(|&d| ((1.0 + n_docs as f32) / (1.0 + d as f32)).ln() + 1.0)
            .collect();

        // Row-normalized TF-IDF document matrix.
        let mut a = Array2::<f32>::zeros((n_docs, vocab.len()));
        for doc in corpus.docs() {
            let mut counts: HashMap<usize, f32> = HashMap::new();
            for token in &doc.tokens {
                if let Some(&tid) = term_ids.get(token) {
                    *counts.entry(tid).or_insert(0.0) += 1.0;
                }
            }
            let mut norm = 0.0f32;
            for (&tid, &tf) in &counts {
                let w = tf * weights[tid];
                a[[doc.id as usize, tid]] = w;
                norm += w * w;
            }
            let norm = norm.sqrt();
            if norm > 0.0 {
                for (&tid, _) in &counts {
                    a[[doc.id as usize, tid]] /= norm;
                }
            }
        }

        let dims = requested_dims.min(n_docs).min(vocab.len());
        if dims == 0 {
            return None;
        }
        let term_coords = truncated_right_singular_vectors(&a, dims);
        let doc_coords = a.dot(&term_coords);
        tracing::info!(dims, vocab = vocab.len(), "fitted latent-semantic model");

        Some(Self {
            vocab,
            term_ids,
            weights,
            term_coords,
            doc_coords,
            dims,
        })
    }

    /// Project a query's filtered term counts into the latent space.
    fn project(&self, query: &str) -> Option<Array1<f32>> {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for term in normalize(query) {
            if let Some(&tid) = self.term_ids.get(&term) {
                *counts.entry(tid).or_insert(0.0) += 1.0;
            }
        }
        if counts.is_empty() {
            return None;
        }
        let mut projected = Array1::<f32>::zeros(self.dims);
        for (tid, tf) in counts {
            let w = tf * self.weights[tid];
            for d in 0..self.dims {
                projected[d] += w * self.term_coords[[tid, d]];
            }
        }
        Some(projected)
    }

    /// Cosine search over reduced document coordinates, top-K descending.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(DocId, f32)> {
        let Some(similarities) = self.doc_similarities(query) else {
            return Vec::new();
        };
        let mut scored: Vec<(DocId, f32)> = similarities
            .into_iter()
            .enumerate()
            .filter(|(_, sim)| sim.is_finite() && *sim > 0.0)
            .map(|(i, sim)| (i as DocId, sim))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        scored
    }

    /// Per-document cosine similarity for annotation; `None` when the query
    /// shares no vocabulary with the model.
    pub fn doc_similarities(&self, query: &str) -> Option<Vec<f32>> {
        let projected = self.project(query)?;
        let query_norm = projected.dot(&projected).sqrt();
        if query_norm == 0.0 {
            return None;
        }
        Some(
            self.doc_coords
                .rows()
                .into_iter()
                .map(|row| {
                    let doc_norm = row.dot(&row).sqrt();
                    if doc_norm == 0.0 {
                        0.0
                    } else {
                        row.dot(&projected) / (query_norm * doc_norm)
                    }
                })
                .collect(),
        )
    }

    /// Human-readable "why this matched" terms: the query's dominant latent
    /// dimensions, their highest-weighted vocabulary terms, intersected with
    /// the description's filtered tokens. Annotation only, never ranking.
    pub fn topic_words(
        &self,
        query: &str,
        description: &str,
        top_topics: usize,
        words_per_topic: usize,
    ) -> Vec<String> {
        let Some(projected) = self.project(query) else {
            return Vec::new();
        };

        let mut dims: Vec<usize> = (0..self.dims).collect();
        dims.sort_by(|&a, &b| {
            projected[b]
                .abs()
                .partial_cmp(&projected[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut candidates: HashSet<&str> = HashSet::new();
        for &dim in dims.iter().take(top_topics) {
            let mut terms: Vec<usize> = (0..self.vocab.len()).collect();
            terms.sort_by(|&a, &b| {
                self.term_coords[[b, dim]]
                    .abs()
                    .partial_cmp(&self.term_coords[[a, dim]].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            for &tid in terms.iter().take(words_per_topic) {
                candidates.insert(&self.vocab[tid]);
            }
        }

        let description_terms: HashSet<String> = normalize(description).into_iter().collect();
        let mut matched: Vec<String> = candidates
            .into_iter()
            .filter(|t| description_terms.contains(*t))
            .map(str::to_string)
            .collect();
        matched.sort_unstable();
        matched
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

/// Top-`k` right singular vectors of `a` (one row per column of `a`),
/// computed by randomized subspace iteration: sketch the range of `a`,
/// orthonormalize, then solve the small eigenproblem of `B·Bᵀ` exactly.
fn truncated_right_singular_vectors(a: &Array2<f32>, k: usize) -> Array2<f32> {
    let (n, m) = a.dim();
    let p = (k + OVERSAMPLE).min(n).min(m);

    let mut rng = XorShift64::new(SEED);
    let omega = Array2::from_shape_fn((m, p), |_| rng.next_unit());
    let mut y = a.dot(&omega);
    orthonormalize_columns(&mut y);
    for _ in 0..POWER_ITERATIONS {
        let mut z = a.t().dot(&y);
        orthonormalize_columns(&mut z);
        y = a.dot(&z);
        orthonormalize_columns(&mut y);
    }

    let b = y.t().dot(a); // p × m
    let gram = b.dot(&b.t()); // p × p, symmetric PSD
    let (eigenvalues, eigenvectors) = jacobi_eigen(&gram);

    let mut v = Array2::<f32>::zeros((m, k));
    for j in 0..k.min(p) {
        let sigma = eigenvalues[j].max(0.0).sqrt();
        if sigma <= 1e-6 {
            continue; // rank exhausted; leave a zero column
        }
        for row in 0..m {
            let mut acc = 0.0f32;
            for i in 0..p {
                acc += b[[i, row]] * eigenvectors[[i, j]];
            }
            v[[row, j]] = acc / sigma;
        }
    }
    v
}

/// In-place modified Gram-Schmidt over columns. Columns that collapse to
/// (near) zero stay zero rather than being renormalized into noise.
fn orthonormalize_columns(m: &mut Array2<f32>) {
    let cols = m.ncols();
    for j in 0..cols {
        for i in 0..j {
            let prev = m.column(i).to_owned();
            let proj = m.column(j).dot(&prev);
            let mut col = m.column_mut(j);
            col.scaled_add(-proj, &prev);
        }
        let norm = m.column(j).dot(&m.column(j)).sqrt();
        if norm > 1e-8 {
            m.column_mut(j).mapv_inplace(|x| x / norm);
        } else {
            m.column_mut(j).fill(0.0);
        }
    }
}

/// Cyclic Jacobi eigendecomposition of a small symmetric matrix, returning
/// eigenvalues (descending) and matching eigenvector columns.
fn jacobi_eigen(sym: &Array2<f32>) -> (Vec<f32>, Array2<f32>) {
    let p = sym.nrows();
    let mut a = sym.clone();
    let mut v = Array2::<f32>::eye(p);

    for _sweep in 0..64 {
        let mut off = 0.0f32;
        for i in 0..p {
            for j in (i + 1)..p {
                off += a[[i, j]] * a[[i, j]];
            }
        }
        if off.sqrt() < 1e-9 {
            break;
        }
        for i in 0..p {
            for j in (i + 1)..p {
                if a[[i, j]].abs() < 1e-12 {
                    continue;
                }
                let theta = (a[[j, j]] - a[[i, i]]) / (2.0 * a[[i, j]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..p {
                    let aki = a[[k, i]];
                    let akj = a[[k, j]];
                    a[[k, i]] = c * aki - s * akj;
                    a[[k, j]] = s * aki + c * akj;
                }
                for k in 0..p {
                    let aik = a[[i, k]];
                    let ajk = a[[j, k]];
                    a[[i, k]] = c * aik - s * ajk;
                    a[[j, k]] = s * aik + c * ajk;
                }
                for k in 0..p {
                    let vki = v[[k, i]];
                    let vkj = v[[k, j]];
                    v[[k, i]] = c * vki - s * vkj;
                    v[[k, j]] = s * vki + c * vkj;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&x, &y| {
        a[[y, y]]
            .partial_cmp(&a[[x, x]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let eigenvalues: Vec<f32> = order.iter().map(|&i| a[[i, i]]).collect();
    let mut eigenvectors = Array2::<f32>::zeros((p, p));
    for (dst, &src) in order.iter().enumerate() {
        for k in 0..p {
            eigenvectors[[k, dst]] = v[[k, src]];
        }
    }
    (eigenvalues, eigenvectors)
}

/// xorshift64* PRNG; deterministic so rebuilds factor identically.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next_unit(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        let scaled = (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 40) as f32;
        scaled / (1u64 << 24) as f32 * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CourseRecord;
    use std::collections::BTreeMap;

    fn corpus_of(courses: &[(&str, &str)]) -> Corpus {
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
        Corpus::assemble(map, HashMap::new(), &HashMap::new())
    }

    fn topic_corpus() -> Corpus {
        corpus_of(&[
            ("CS1110", "python programming loops functions recursion"),
            ("CS2110", "python programming objects classes recursion"),
            ("CS3110", "functional programming ocaml recursion types"),
            ("HIST101", "roman empire history senate legions"),
            ("HIST201", "medieval history kingdoms castles empire"),
            ("ART150", "painting color composition studio practice"),
        ])
    }

    #[test]
    fn dims_clamped_to_corpus() {
        let model = LatentModel::build(&topic_corpus(), 100).unwrap();
        assert!(model.dims() <= 6);
    }

    #[test]
    fn empty_corpus_yields_no_model() {
        let corpus = corpus_of(&[]);
        assert!(LatentModel::build(&corpus, 10).is_none());
    }

    #[test]
    fn search_finds_topically_similar_documents() {
        let corpus = topic_corpus();
        let model = LatentModel::build(&corpus, 4).unwrap();
        let hits = model.search("python recursion", 3);
        assert!(!hits.is_empty());
        let top_code = &corpus.get(hits[0].0).unwrap().code;
        assert!(top_code.starts_with("CS"), "expected a CS course, got {top_code}");
    }

    #[test]
    fn similarities_are_finite_and_bounded() {
        let corpus = topic_corpus();
        let model = LatentModel::build(&corpus, 4).unwrap();
        let hits = model.search("history empire", 10);
        assert!(hits.len() <= 10);
        for (_, sim) in &hits {
            assert!(sim.is_finite());
            assert!(*sim <= 1.0 + 1e-4);
        }
    }

    #[test]
    fn unknown_vocabulary_query_returns_empty() {
        let corpus = topic_corpus();
        let model = LatentModel::build(&corpus, 4).unwrap();
        assert!(model.search("zzzzqqq", 5).is_empty());
    }

    #[test]
    fn topic_words_come_from_description() {
        let corpus = topic_corpus();
        let model = LatentModel::build(&corpus, 4).unwrap();
        let doc = corpus.get(corpus.id_of("CS1110").unwrap()).unwrap();
        let words = model.topic_words("python recursion", &doc.description, 3, 8);
        let description_terms: HashSet<String> =
            normalize(&doc.description).into_iter().collect();
        assert!(words.iter().all(|w| description_terms.contains(w)));
    }

    #[test]
    fn factorization_is_deterministic() {
        let corpus = topic_corpus();
        let a = LatentModel::build(&corpus, 4).unwrap();
        let b = LatentModel::build(&corpus, 4).unwrap();
        let ha = a.search("python recursion", 6);
        let hb = b.search("python recursion", 6);
        assert_eq!(
            ha.iter().map(|(d, _)| *d).collect::<Vec<_>>(),
            hb.iter().map(|(d, _)| *d).collect::<Vec<_>>()
        );
    }
}
