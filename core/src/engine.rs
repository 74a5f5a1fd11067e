use crate::config::EngineConfig;
use crate::corpus::{Corpus, DocId, EmbeddingSnapshot, RatingSummary};
use crate::dense::{Embedder, EmbeddingIndex};
use crate::feedback::adjust_query_vector;
use crate::latent::LatentModel;
use crate::lexical::{LexicalHit, LexicalScorer};
use crate::merge::{dedup_and_truncate, ScoredResult, SubScores};
use crate::sentiment::{rescale, SentimentClassifier};
use crate::tokenizer::normalize;
use ndarray::{Array1, ArrayView1};
use std::collections::HashMap;

/// Topic-word annotation shape: dominant latent dimensions per query, and
/// words surfaced per dimension.
const TOPIC_DIMS: usize = 3;
const WORDS_PER_TOPIC: usize = 5;

/// Ranked signal tiers, tried in order until one produces candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTier {
    Dense,
    Latent,
    Lexical,
    Substring,
}

/// Assembles a [`SearchEngine`] from snapshot pieces and optional external
/// models. Everything optional degrades the engine rather than failing it.
pub struct SearchEngineBuilder {
    corpus: Corpus,
    config: EngineConfig,
    embeddings: Option<EmbeddingSnapshot>,
    title_embeddings: Option<EmbeddingSnapshot>,
    embedder: Option<Box<dyn Embedder>>,
    classifier: Option<Box<dyn SentimentClassifier>>,
}

impl SearchEngineBuilder {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            config: EngineConfig::default(),
            embeddings: None,
            title_embeddings: None,
            embedder: None,
            classifier: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn embeddings(mut self, snapshot: EmbeddingSnapshot) -> Self {
        self.embeddings = Some(snapshot);
        self
    }

    pub fn title_embeddings(mut self, snapshot: EmbeddingSnapshot) -> Self {
        self.title_embeddings = Some(snapshot);
        self
    }

    pub fn embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn classifier(mut self, classifier: Box<dyn SentimentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Blocking initialization: builds every index structure up front.
    /// After this returns, nothing in the engine is ever mutated.
    pub fn build(self) -> SearchEngine {
        let lexical = LexicalScorer::build(&self.corpus);
        let latent = LatentModel::build(&self.corpus, self.config.latent_dims);
        let dense = self
            .embeddings
            .as_ref()
            .and_then(|s| EmbeddingIndex::from_snapshot(s, &self.corpus));
        let titles = self
            .title_embeddings
            .as_ref()
            .and_then(|s| EmbeddingIndex::from_snapshot(s, &self.corpus));

        if dense.is_none() {
            tracing::warn!("dense embeddings unavailable; primary tier disabled");
        }
        if latent.is_none() {
            tracing::warn!("latent-semantic model unavailable");
        }

        let engine = SearchEngine {
            corpus: self.corpus,
            config: self.config,
            lexical,
            latent,
            dense,
            titles,
            embedder: self.embedder,
            classifier: self.classifier,
        };
        tracing::info!(tiers = ?engine.available_tiers(), "search engine ready");
        engine
    }
}

/// The immutable per-process search context. Built once at startup and
/// shared by reference across concurrent queries; per-request state lives
/// entirely on the stack of each call.
pub struct SearchEngine {
    corpus: Corpus,
    config: EngineConfig,
    lexical: LexicalScorer,
    latent: Option<LatentModel>,
    dense: Option<EmbeddingIndex>,
    titles: Option<EmbeddingIndex>,
    embedder: Option<Box<dyn Embedder>>,
    classifier: Option<Box<dyn SentimentClassifier>>,
}

impl SearchEngine {
    pub fn builder(corpus: Corpus) -> SearchEngineBuilder {
        SearchEngineBuilder::new(corpus)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Signal tiers usable right now, strongest first. The substring
    /// fallback is always present.
    pub fn available_tiers(&self) -> Vec<SignalTier> {
        let mut tiers = Vec::new();
        if self.embedder.is_some() && self.dense.is_some() {
            tiers.push(SignalTier::Dense);
        }
        if self.latent.is_some() {
            tiers.push(SignalTier::Latent);
        }
        if self.lexical.num_terms() > 0 {
            tiers.push(SignalTier::Lexical);
        }
        tiers.push(SignalTier::Substring);
        tiers
    }

    /// Primary entry point: rank the corpus against a free-text query.
    /// An empty query (after normalization) returns an empty list.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ScoredResult> {
        if normalize(query).is_empty() {
            return Vec::new();
        }
        let pool = self.config.candidate_pool.max(top_k);
        let query_vec = self.embed_query(query);
        let ranked = self.rank_candidates(query, query_vec.as_ref(), pool);
        self.finish(
            query,
            query_vec.as_ref(),
            query_vec.as_ref(),
            ranked,
            top_k,
            true,
        )
    }

    /// Nearest neighbors of a document's own description embedding. The
    /// seed document is excluded from its result list. Unknown codes and
    /// missing embeddings degrade to a lexical search over the seed's
    /// description text.
    pub fn find_similar(&self, course_code: &str, top_k: usize) -> Vec<ScoredResult> {
        let Some(doc_id) = self.corpus.id_of(course_code) else {
            tracing::warn!(course_code, "find_similar for unknown course");
            return Vec::new();
        };
        let Some(seed) = self.corpus.get(doc_id) else {
            return Vec::new();
        };
        let description = seed.description.clone();
        let pool = self.config.candidate_pool.max(top_k);

        if let Some(dense) = &self.dense {
            if let Some(seed_vec) = dense.vector_for(doc_id) {
                let seed_vec = seed_vec.to_owned();
                let mut ranked = dense.search(&seed_vec.view(), pool + 1);
                ranked.retain(|(id, _)| *id != doc_id);
                return self.finish(
                    &description,
                    Some(&seed_vec),
                    Some(&seed_vec),
                    ranked,
                    top_k,
                    false,
                );
            }
            tracing::warn!(course_code, "no stored embedding for seed; using lexical neighbors");
        }

        let mut ranked: Vec<(DocId, f32)> = self
            .lexical
            .search(&description, pool + 1)
            .into_iter()
            .map(|h| (h.doc_id, h.score))
            .collect();
        ranked.retain(|(id, _)| *id != doc_id);
        self.finish(&description, None, None, ranked, top_k, false)
    }

    /// Rocchio-adjusted search: shift the query embedding toward marked
    /// relevant and away from marked non-relevant courses, then re-run the
    /// dense search. Dense sub-scores reflect the adjusted vector (it did
    /// the ranking); title and lexical sub-scores stay pre-feedback.
    /// Degrades to a plain search when the dense tier is unavailable.
    pub fn apply_feedback(
        &self,
        query: &str,
        relevant: &[String],
        non_relevant: &[String],
        top_k: usize,
    ) -> Vec<ScoredResult> {
        if normalize(query).is_empty() {
            return Vec::new();
        }
        let (Some(dense), Some(query_vec)) = (self.dense.as_ref(), self.embed_query(query))
        else {
            tracing::warn!("dense tier unavailable; feedback ignored");
            return self.search(query, top_k);
        };

        let relevant_vecs = self.feedback_vectors(dense, relevant);
        let non_relevant_vecs = self.feedback_vectors(dense, non_relevant);
        let adjusted = adjust_query_vector(
            &query_vec.view(),
            &relevant_vecs,
            &non_relevant_vecs,
            self.config.rocchio_alpha,
            self.config.rocchio_beta,
            self.config.rocchio_gamma,
        );

        let pool = self.config.candidate_pool.max(top_k);
        let ranked = dense.search(&adjusted.view(), pool);
        self.finish(query, Some(&adjusted), Some(&query_vec), ranked, top_k, true)
    }

    /// Averaged review ratings for one course; `None` for unknown codes.
    pub fn ratings(&self, course_code: &str) -> Option<RatingSummary> {
        self.corpus.ratings(course_code)
    }

    fn feedback_vectors<'a>(
        &self,
        dense: &'a EmbeddingIndex,
        codes: &[String],
    ) -> Vec<ArrayView1<'a, f32>> {
        codes
            .iter()
            .filter_map(|code| {
                let id = self.corpus.id_of(code)?;
                let vec = dense.vector_for(id);
                if vec.is_none() {
                    tracing::warn!(code, "feedback course has no stored embedding; skipped");
                }
                vec
            })
            .collect()
    }

    /// Embed the query if an embedder and a dense index are wired in.
    /// Model failure is logged and reported as absence, never propagated.
    fn embed_query(&self, query: &str) -> Option<Array1<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(query) {
            Ok(vec) => Some(vec),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; degrading");
                None
            }
        }
    }

    fn classify_query(&self, query: &str) -> Option<f32> {
        let classifier = self.classifier.as_ref()?;
        match classifier.classify(query) {
            Ok(score) => Some(score),
            Err(e) => {
                tracing::warn!(error = %e, "query sentiment failed; skipping alignment");
                None
            }
        }
    }

    /// Walk the tier chain until one produces candidates.
    fn rank_candidates(
        &self,
        query: &str,
        query_vec: Option<&Array1<f32>>,
        pool: usize,
    ) -> Vec<(DocId, f32)> {
        if let (Some(qv), Some(dense)) = (query_vec, self.dense.as_ref()) {
            let ranked = dense.search(&qv.view(), pool);
            if !ranked.is_empty() {
                return ranked;
            }
        }
        if let Some(latent) = &self.latent {
            let ranked = latent.search(query, pool);
            if !ranked.is_empty() {
                return ranked;
            }
        }
        let ranked: Vec<(DocId, f32)> = self
            .lexical
            .search(query, pool)
            .into_iter()
            .map(|h| (h.doc_id, h.score))
            .collect();
        if !ranked.is_empty() {
            return ranked;
        }
        self.substring_search(query, pool)
    }

    /// Last-resort scorer: raw substring containment against course code,
    /// title, and description, weighted 10/5/3.
    fn substring_search(&self, query: &str, pool: usize) -> Vec<(DocId, f32)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(DocId, f32)> = self
            .corpus
            .docs()
            .iter()
            .filter_map(|doc| {
                let mut score = 0.0f32;
                if doc.code.to_lowercase().contains(&needle) {
                    score += 10.0;
                }
                if doc.title.to_lowercase().contains(&needle) {
                    score += 5.0;
                }
                if doc.description.to_lowercase().contains(&needle) {
                    score += 3.0;
                }
                (score > 0.0).then_some((doc.id, score))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(pool);
        scored
    }

    /// Shared tail of every entry point: sentiment rescale, re-sort,
    /// deduplicate, truncate, and attach sub-scores and explanations.
    ///
    /// `dense_vec` feeds the dense sub-score, `title_vec` the title one;
    /// they differ only on the feedback path.
    fn finish(
        &self,
        query_text: &str,
        dense_vec: Option<&Array1<f32>>,
        title_vec: Option<&Array1<f32>>,
        ranked: Vec<(DocId, f32)>,
        top_k: usize,
        align_sentiment: bool,
    ) -> Vec<ScoredResult> {
        if ranked.is_empty() {
            return Vec::new();
        }

        let query_sentiment = if align_sentiment {
            self.classify_query(query_text)
        } else {
            None
        };
        let lexical_hits: HashMap<DocId, LexicalHit> = self
            .lexical
            .search(query_text, usize::MAX)
            .into_iter()
            .map(|h| (h.doc_id, h))
            .collect();
        let latent_sims = self
            .latent
            .as_ref()
            .and_then(|m| m.doc_similarities(query_text));
        let dense_map = match (dense_vec, self.dense.as_ref()) {
            (Some(qv), Some(dense)) => Some(dense.similarity_map(&qv.view())),
            _ => None,
        };
        let title_map = match (title_vec, self.titles.as_ref()) {
            (Some(qv), Some(titles)) => Some(titles.similarity_map(&qv.view())),
            _ => None,
        };

        let alpha = self.config.sentiment_alpha;
        let mut results: Vec<ScoredResult> = ranked
            .into_iter()
            .filter_map(|(doc_id, base)| {
                let Some(doc) = self.corpus.get(doc_id) else {
                    tracing::warn!(doc_id, "scorer produced out-of-range document id; dropped");
                    return None;
                };
                let score = match query_sentiment {
                    Some(qs) if alpha > 0.0 => rescale(qs, doc.sentiment, base, alpha),
                    _ => base,
                };
                let lexical_hit = lexical_hits.get(&doc_id);
                let topic_words = self
                    .latent
                    .as_ref()
                    .map(|m| m.topic_words(query_text, &doc.description, TOPIC_DIMS, WORDS_PER_TOPIC))
                    .unwrap_or_default();
                Some(ScoredResult {
                    doc_id,
                    code: doc.code.clone(),
                    title: doc.title.clone(),
                    score,
                    top_terms: lexical_hit.map(|h| h.top_terms.clone()).unwrap_or_default(),
                    topic_words,
                    sub_scores: SubScores {
                        lexical: lexical_hit.map(|h| h.score),
                        latent: latent_sims
                            .as_ref()
                            .and_then(|sims| sims.get(doc_id as usize).copied()),
                        dense: dense_map.as_ref().and_then(|m| m.get(&doc_id).copied()),
                        title: title_map.as_ref().and_then(|m| m.get(&doc_id).copied()),
                        sentiment: query_sentiment.map(|_| doc.sentiment),
                    },
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        dedup_and_truncate(results, &self.corpus, top_k)
    }
}
