//! Engine settings.
//!
//! Defaults: four concatenated text fields, `ln(N/df)` recomputed per query
//! with the query as a pseudo-document, and no post-ranking threshold.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_FIELDS: [&str; 4] = ["title", "description", "purpose", "application"];

/// How document frequency is turned into an inverse document frequency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfWeighting {
    /// `ln(N / df)`
    #[default]
    Standard,
    /// `ln(1 + N / df)`, never zero
    Smoothed,
}

impl IdfWeighting {
    pub fn idf(self, total_documents: usize, document_frequency: u32) -> f64 {
        let ratio = total_documents as f64 / document_frequency.max(1) as f64;
        match self {
            IdfWeighting::Standard => ratio.ln(),
            IdfWeighting::Smoothed => (1.0 + ratio).ln(),
        }
    }
}

/// Which pseudo-corpus the IDF statistics are computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfMode {
    /// Query plus every document, rebuilt for each search.
    #[default]
    PerQuery,
    /// Documents only, computed once when the corpus is prepared. Scores differ from `PerQuery`.
    CorpusOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Document fields concatenated (in order) before tokenization.
    pub fields: Vec<String>,
    pub idf: IdfWeighting,
    pub idf_mode: IdfMode,
    pub extra_stopwords: Vec<String>,
    /// Apply NFKC folding before lowercasing.
    pub unicode_fold: bool,
    /// Results at or below this similarity are dropped after ranking; 0 disables.
    pub min_similarity: f64,
    pub default_top_n: usize,
    pub max_top_n: usize,
    /// Corpora with at least this many documents are scored in parallel.
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            idf: IdfWeighting::default(),
            idf_mode: IdfMode::default(),
            extra_stopwords: Vec::new(),
            unicode_fold: false,
            min_similarity: 0.0,
            default_top_n: 5,
            max_top_n: 100,
            parallel_threshold: 2048,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.iter().all(|f| f.trim().is_empty()) {
            return Err(ConfigError::NoFields);
        }
        if self.max_top_n == 0 {
            return Err(ConfigError::ZeroMaxTopN);
        }
        if self.default_top_n == 0 || self.default_top_n > self.max_top_n {
            return Err(ConfigError::DefaultTopN { default: self.default_top_n, max: self.max_top_n });
        }
        if !(0.0..1.0).contains(&self.min_similarity) {
            return Err(ConfigError::MinSimilarity(self.min_similarity));
        }
        Ok(())
    }
}
