//! Hybrid course-search library: lexical TF-IDF, latent-semantic, and dense
//! embedding signals over an immutable in-memory corpus, with sentiment
//! alignment and Rocchio relevance feedback layered on top.

pub mod config;
pub mod corpus;
pub mod dense;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod index;
pub mod latent;
pub mod lexical;
pub mod merge;
pub mod sentiment;
pub mod stats;
pub mod tokenizer;

pub use config::EngineConfig;
pub use corpus::{Corpus, CourseRecord, DocId, EmbeddingSnapshot, RatingSummary, Review};
pub use dense::Embedder;
pub use engine::{SearchEngine, SearchEngineBuilder, SignalTier};
pub use error::EngineError;
pub use merge::{ScoredResult, SubScores};
pub use sentiment::{LexiconClassifier, SentimentClassifier};
