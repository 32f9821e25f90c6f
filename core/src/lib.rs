//! TF-IDF similar-record retrieval.
//!
//! Given free text describing an item, rank a fixed corpus of records by
//! cosine similarity of their TF-IDF vectors and return the best matches.

pub mod config;
pub mod corpus;
pub mod error;
pub mod ranker;
pub mod similarity;
pub mod stats;
pub mod stopwords;
pub mod tokenizer;
pub mod vector;

pub use config::{EngineConfig, IdfMode, IdfWeighting};
pub use corpus::{Corpus, Document, DocumentId, PreparedCorpus};
pub use error::{ConfigError, CorpusError, SearchError};
pub use ranker::{search, Engine, QueryFields, Ranking, SearchOptions, SimilarityResult};
pub use stopwords::StopwordSet;
pub use tokenizer::{tokenize, Tokenizer};
