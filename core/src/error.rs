use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while loading snapshots or calling external models.
///
/// Query-path code never returns these to callers: a failed model call or a
/// missing signal degrades the search to the next available tier instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A snapshot file could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file was read but could not be decoded.
    #[error("failed to decode snapshot {path}: {message}")]
    SnapshotDecode { path: PathBuf, message: String },

    /// The external sentence-embedding model failed or timed out.
    #[error("embedding model failed: {0}")]
    Embedding(String),

    /// The external sentiment classifier failed or timed out.
    #[error("sentiment classifier failed: {0}")]
    Sentiment(String),
}
