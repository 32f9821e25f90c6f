//! Query execution: analyze, weight, score every document, rank.
//!
//! Each call is a single pass over the whole corpus. Nothing is cached
//! between calls apart from what a [`PreparedCorpus`] already holds.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{EngineConfig, IdfMode};
use crate::corpus::{compose_text, Corpus, Document, DocumentId, PreparedCorpus};
use crate::error::{ConfigError, SearchError};
use crate::similarity::cosine;
use crate::stats::{build_idf, build_query_idf, IdfMap};
use crate::stopwords::StopwordSet;
use crate::tokenizer::Tokenizer;
use crate::vector::WeightVector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub document_id: DocumentId,
    pub similarity: f64,
    /// 1-based position in the returned list.
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_n: usize,
    /// Applied after ranking; results at or below it are dropped. 0 disables.
    pub min_similarity: f64,
}

impl SearchOptions {
    pub fn top(top_n: usize) -> Self {
        Self { top_n, min_similarity: 0.0 }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.top_n == 0 {
            return Err(SearchError::ZeroTopN);
        }
        if !(0.0..1.0).contains(&self.min_similarity) {
            return Err(SearchError::InvalidThreshold(self.min_similarity));
        }
        Ok(())
    }
}

/// Ranked results plus the number of documents that had any overlap at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub results: Vec<SimilarityResult>,
    pub total_hits: usize,
}

/// Query text assembled from the same named fields documents are indexed by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryFields(pub BTreeMap<String, String>);

impl QueryFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn text(&self, fields: &[String]) -> String {
        compose_text(&self.0, fields)
    }
}

/// The similarity engine: configuration plus the stopword set derived from it.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    tokenizer: Tokenizer,
    stopwords: StopwordSet,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            tokenizer: Tokenizer::default(),
            stopwords: StopwordSet::shared().clone(),
        }
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let stopwords = StopwordSet::with_extra(&config.extra_stopwords);
        let tokenizer = Tokenizer::new(config.unicode_fold);
        Ok(Self { config, tokenizer, stopwords })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stopwords(&self) -> &StopwordSet {
        &self.stopwords
    }

    /// Tokens of `text` after normalization and stopword removal.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.tokenizer.analyze(text, &self.stopwords)
    }

    pub fn analyze_document(&self, doc: &Document) -> Vec<String> {
        self.analyze(&doc.text(&self.config.fields))
    }

    /// Tokenize every document once so repeated searches skip that work.
    pub fn prepare(&self, corpus: Corpus) -> PreparedCorpus {
        let tokens = self.tokenize_corpus(&corpus);
        let corpus_idf = match self.config.idf_mode {
            IdfMode::PerQuery => None,
            IdfMode::CorpusOnly => Some(build_idf(tokens.iter().map(Vec::as_slice), self.config.idf)),
        };
        PreparedCorpus::new(corpus, tokens, corpus_idf)
    }

    /// Top `top_n` documents of a prepared corpus by cosine similarity to `query`.
    pub fn search(
        &self,
        query: &str,
        corpus: &PreparedCorpus,
        top_n: usize,
    ) -> Result<Vec<SimilarityResult>, SearchError> {
        Ok(self.search_with(query, corpus, &SearchOptions::top(top_n))?.results)
    }

    pub fn search_with(
        &self,
        query: &str,
        corpus: &PreparedCorpus,
        options: &SearchOptions,
    ) -> Result<Ranking, SearchError> {
        self.rank(query, corpus.corpus().documents(), corpus.tokens(), corpus.corpus_idf(), options)
    }

    /// Search a corpus that has not been prepared, tokenizing its documents on the way.
    pub fn search_corpus(
        &self,
        query: &str,
        corpus: &Corpus,
        top_n: usize,
    ) -> Result<Vec<SimilarityResult>, SearchError> {
        let options = SearchOptions::top(top_n);
        options.validate()?;
        let tokens = self.tokenize_corpus(corpus);
        Ok(self.rank(query, corpus.documents(), &tokens, None, &options)?.results)
    }

    fn tokenize_corpus(&self, corpus: &Corpus) -> Vec<Vec<String>> {
        let docs = corpus.documents();
        if docs.len() >= self.config.parallel_threshold {
            docs.par_iter().map(|d| self.analyze_document(d)).collect()
        } else {
            docs.iter().map(|d| self.analyze_document(d)).collect()
        }
    }

    fn rank(
        &self,
        query: &str,
        documents: &[Document],
        doc_tokens: &[Vec<String>],
        corpus_idf: Option<&IdfMap>,
        options: &SearchOptions,
    ) -> Result<Ranking, SearchError> {
        options.validate()?;
        let start = Instant::now();

        let query_tokens = self.analyze(query);
        if query_tokens.is_empty() {
            tracing::debug!("query has no tokens after filtering");
            return Ok(Ranking::default());
        }

        let idf: Cow<'_, IdfMap> = match (self.config.idf_mode, corpus_idf) {
            (IdfMode::PerQuery, _) => {
                Cow::Owned(build_query_idf(&query_tokens, doc_tokens, self.config.idf))
            }
            (IdfMode::CorpusOnly, Some(idf)) => Cow::Borrowed(idf),
            (IdfMode::CorpusOnly, None) => {
                Cow::Owned(build_idf(doc_tokens.iter().map(Vec::as_slice), self.config.idf))
            }
        };
        let idf: &IdfMap = &idf;

        let query_vector = WeightVector::build(&query_tokens, idf);
        let score = |tokens: &Vec<String>| cosine(&query_vector, &WeightVector::build(tokens, idf));
        // indexed collect keeps corpus order, which the stable sort below relies on
        let scores: Vec<f64> = if doc_tokens.len() >= self.config.parallel_threshold {
            doc_tokens.par_iter().map(score).collect()
        } else {
            doc_tokens.iter().map(score).collect()
        };

        let mut hits: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, s)| *s > 0.0)
            .collect();
        let total_hits = hits.len();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(options.top_n);

        let results: Vec<SimilarityResult> = hits
            .into_iter()
            .enumerate()
            .map(|(i, (pos, similarity))| SimilarityResult {
                document_id: documents[pos].id.clone(),
                similarity,
                rank: i + 1,
            })
            .take_while(|r| options.min_similarity <= 0.0 || r.similarity > options.min_similarity)
            .collect();

        tracing::debug!(
            query_tokens = query_tokens.len(),
            scored = doc_tokens.len(),
            total_hits,
            returned = results.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "search complete"
        );
        Ok(Ranking { results, total_hits })
    }
}

/// Rank `corpus` against `query` with the default configuration.
pub fn search(query: &str, corpus: &Corpus, top_n: usize) -> Result<Vec<SimilarityResult>, SearchError> {
    Engine::default().search_corpus(query, corpus, top_n)
}
