use crate::error::EngineError;
use crate::tokenizer::normalize;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub type DocId = u32;

/// A review rating as scraped: either a number or the placeholder "-".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rating {
    Number(f64),
    Text(String),
}

impl Rating {
    /// Numeric value, if the rating is a number or a parsable string.
    /// The "-" placeholder (and anything else unparsable) yields None.
    pub fn value(&self) -> Option<f64> {
        match self {
            Rating::Number(n) => Some(*n),
            Rating::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub difficulty: Option<Rating>,
    #[serde(default)]
    pub workload: Option<Rating>,
    #[serde(default)]
    pub overall: Option<Rating>,
    #[serde(default)]
    pub comment: String,
}

/// One course as it appears in the corpus snapshot, keyed by course code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(default)]
    pub description: String,
    #[serde(alias = "course title", default)]
    pub title: String,
    #[serde(default)]
    pub term_offered: Vec<String>,
    #[serde(default)]
    pub distributions: Vec<String>,
}

/// Averaged review ratings; all zero for an empty or all-placeholder set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub avg_difficulty: f64,
    pub avg_workload: f64,
    pub avg_overall: f64,
}

impl RatingSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        fn avg(values: impl Iterator<Item = f64>) -> f64 {
            let (sum, count) = values.fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));
            if count > 0 {
                sum / f64::from(count)
            } else {
                0.0
            }
        }
        Self {
            avg_difficulty: avg(reviews.iter().filter_map(|r| r.difficulty.as_ref()?.value())),
            avg_workload: avg(reviews.iter().filter_map(|r| r.workload.as_ref()?.value())),
            avg_overall: avg(reviews.iter().filter_map(|r| r.overall.as_ref()?.value())),
        }
    }
}

/// An immutable course document. Built once per corpus assembly and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub code: String,
    pub title: String,
    pub description: String,
    /// Normalized (stop-word-filtered) description tokens.
    pub tokens: Vec<String>,
    /// Aggregate review sentiment, 0.0 when absent.
    pub sentiment: f32,
    pub term_offered: Vec<String>,
    pub distributions: Vec<String>,
    pub reviews: Vec<Review>,
}

/// The in-memory corpus: a dense-id document arena plus a course-code map
/// for O(1) external lookups.
#[derive(Debug, Default)]
pub struct Corpus {
    docs: Vec<Document>,
    by_code: HashMap<String, DocId>,
}

impl Corpus {
    /// Assemble the corpus from snapshot pieces. Document ids are assigned
    /// 0-based in course-code order, so a rebuild from the same snapshot
    /// yields the same ids.
    pub fn assemble(
        courses: BTreeMap<String, CourseRecord>,
        mut reviews: HashMap<String, Vec<Review>>,
        sentiments: &HashMap<String, f32>,
    ) -> Self {
        let mut docs = Vec::with_capacity(courses.len());
        let mut by_code = HashMap::with_capacity(courses.len());
        for (code, record) in courses {
            let id = docs.len() as DocId;
            let tokens = normalize(&record.description);
            docs.push(Document {
                id,
                code: code.clone(),
                title: record.title,
                description: record.description,
                tokens,
                sentiment: sentiments.get(&code).copied().unwrap_or(0.0),
                term_offered: record.term_offered,
                distributions: record.distributions,
                reviews: reviews.remove(&code).unwrap_or_default(),
            });
            by_code.insert(code, id);
        }
        tracing::info!(num_docs = docs.len(), "assembled corpus");
        Self { docs, by_code }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.docs.get(id as usize)
    }

    pub fn id_of(&self, code: &str) -> Option<DocId> {
        self.by_code.get(code).copied()
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn ratings(&self, code: &str) -> Option<RatingSummary> {
        let doc = self.get(self.id_of(code)?)?;
        Some(RatingSummary::from_reviews(&doc.reviews))
    }
}

/// Precomputed sentence embeddings: course codes paired row-for-row with
/// vectors, as produced by an offline embedding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSnapshot {
    pub codes: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let raw = fs::read_to_string(path).map_err(|source| EngineError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| EngineError::SnapshotDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the course snapshot (course code -> record).
pub fn load_courses(path: &Path) -> Result<BTreeMap<String, CourseRecord>, EngineError> {
    read_json(path)
}

/// Load the review snapshot (course code -> reviews).
pub fn load_reviews(path: &Path) -> Result<HashMap<String, Vec<Review>>, EngineError> {
    read_json(path)
}

/// Load the precomputed sentiment store (course code -> signed score).
pub fn load_sentiments(path: &Path) -> Result<HashMap<String, f32>, EngineError> {
    read_json(path)
}

pub fn load_embedding_snapshot(path: &Path) -> Result<EmbeddingSnapshot, EngineError> {
    let raw = fs::read(path).map_err(|source| EngineError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    })?;
    bincode::deserialize(&raw).map_err(|e| EngineError::SnapshotDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn save_embedding_snapshot(path: &Path, snapshot: &EmbeddingSnapshot) -> Result<(), EngineError> {
    let bytes = bincode::serialize(snapshot).map_err(|e| EngineError::SnapshotDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, bytes).map_err(|source| EngineError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    })
}
