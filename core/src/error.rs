use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Every record was skipped, so IDF has no corpus to be computed over.
    #[error("corpus has no valid documents ({skipped} records skipped)")]
    EmptyCorpus { skipped: usize },

    #[error("failed to load index from {path}: {reason}")]
    IndexLoad { path: PathBuf, reason: String },

    #[error("failed to read stopword list {path}: {source}")]
    Stopwords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("inconsistent index: {0}")]
    InvalidIndex(String),

    #[error("invalid field weights: {0}")]
    FieldWeights(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}

impl EngineError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        EngineError::IndexLoad { path: path.into(), reason: reason.to_string() }
    }
}
