use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::BatchId;

/// Error type for batch loading, configuration, and persistence failures.
#[derive(Debug, Error)]
pub enum RelevanceError {
    #[error("malformed {kind} record at {location}: {reason}")]
    MalformedRecord {
        kind: &'static str,
        location: String,
        reason: String,
    },
    #[error("article batch '{batch_id}' is unavailable: {reason}")]
    BatchUnavailable { batch_id: BatchId, reason: String },
    #[error("failed to persist relevance summaries to '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid tree number '{0}'")]
    InvalidTreeNumber(String),
    #[error("unsupported relevance summary version '{0}'")]
    UnsupportedSummaryVersion(String),
}
