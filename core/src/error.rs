use std::path::PathBuf;

use crate::corpus::DocumentId;

/// Caller contract violations detected before any scoring begins.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("top_n must be greater than zero")]
    ZeroTopN,

    #[error("top_n {requested} exceeds the maximum of {max}")]
    TopNTooLarge { requested: usize, max: usize },

    #[error("min_similarity must be within [0, 1), got {0}")]
    InvalidThreshold(f64),
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("corpus path {0} is neither a file nor a directory")]
    NotFound(PathBuf),

    #[error("expected a JSON array of records, found {0}")]
    NotAnArray(&'static str),

    #[error("corpus record {index} is not a JSON object")]
    NotARecord { index: usize },

    #[error("corpus record {index} is missing required field `id`")]
    MissingId { index: usize },

    #[error("corpus record {index} has an `id` that is neither a string nor an integer: {found}")]
    InvalidId { index: usize, found: String },

    #[error("duplicate document id {0}")]
    DuplicateId(DocumentId),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one document field must be configured")]
    NoFields,

    #[error("max_top_n must be at least 1")]
    ZeroMaxTopN,

    #[error("default_top_n {default} must be within 1..={max}")]
    DefaultTopN { default: usize, max: usize },

    #[error("min_similarity must be within [0, 1), got {0}")]
    MinSimilarity(f64),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
