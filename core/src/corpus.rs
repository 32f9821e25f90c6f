//! Corpus records and loading.
//!
//! A corpus is an ordered list of records, each an object with an `id` and
//! any number of other fields. Order matters: ties in similarity are broken by
//! position in the corpus. Records can come from a JSON array, a JSON Lines
//! file, or a directory of either.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::CorpusError;
use crate::stats::IdfMap;

/// Record identifier, kept in the JSON shape it was read in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    Text(String),
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Int(n) => write!(f, "{n}"),
            DocumentId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DocumentId {
    fn from(n: i64) -> Self {
        DocumentId::Int(n)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId::Text(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        DocumentId::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self { id: id.into(), fields: BTreeMap::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The named fields joined by single spaces; missing fields contribute an empty string.
    pub fn text(&self, fields: &[String]) -> String {
        compose_text(&self.fields, fields)
    }

    fn from_record(index: usize, record: Value) -> Result<Self, CorpusError> {
        let Value::Object(map) = record else {
            return Err(CorpusError::NotARecord { index });
        };
        let id = match map.get("id") {
            None | Some(Value::Null) => return Err(CorpusError::MissingId { index }),
            Some(Value::String(s)) => DocumentId::Text(s.clone()),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(n) => DocumentId::Int(n),
                None => return Err(CorpusError::InvalidId { index, found: n.to_string() }),
            },
            Some(other) => return Err(CorpusError::InvalidId { index, found: other.to_string() }),
        };
        let mut fields = BTreeMap::new();
        for (name, value) in map {
            if name == "id" {
                continue;
            }
            // scalars stay searchable (e.g. a `year` column); nested values are skipped
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => continue,
            };
            fields.insert(name, text);
        }
        Ok(Self { id, fields })
    }
}

/// Join the named entries of `values` in order, separated by single spaces.
pub fn compose_text(values: &BTreeMap<String, String>, fields: &[String]) -> String {
    fields
        .iter()
        .map(|name| values.get(name).map(String::as_str).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered, read-only document collection.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    positions: HashMap<DocumentId, usize>,
    source: Option<PathBuf>,
}

impl Corpus {
    pub fn from_documents(documents: Vec<Document>) -> Result<Self, CorpusError> {
        let mut positions = HashMap::with_capacity(documents.len());
        for (pos, doc) in documents.iter().enumerate() {
            if positions.insert(doc.id.clone(), pos).is_some() {
                return Err(CorpusError::DuplicateId(doc.id.clone()));
            }
        }
        Ok(Self { documents, positions, source: None })
    }

    /// Build from a JSON array of records, or a single record object.
    pub fn from_json_value(value: Value) -> Result<Self, CorpusError> {
        let mut records = Vec::new();
        push_records(value, &mut records)?;
        Self::from_records(records)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CorpusError> {
        Self::from_json_value(serde_json::from_str(json)?)
    }

    /// Load a `.json` array, a `.jsonl` file, or every such file under a directory
    /// (visited in sorted path order, following symlinks). An unreadable entry or a
    /// dangling link fails the whole load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let mut files: Vec<PathBuf> = Vec::new();
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let at = e.path().unwrap_or(path).to_path_buf();
                    CorpusError::Io { path: at, source: e.into() }
                })?;
                let p = entry.path();
                if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                    files.push(p.to_path_buf());
                }
            }
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            return Err(CorpusError::NotFound(path.to_path_buf()));
        }

        let mut records = Vec::new();
        for file in &files {
            if extension(file) == Some("jsonl") {
                read_jsonl(file, &mut records)?;
            } else {
                read_json(file, &mut records)?;
            }
        }

        let mut corpus = Self::from_records(records)?;
        corpus.source = Some(path.to_path_buf());
        tracing::info!(documents = corpus.len(), files = files.len(), path = %path.display(), "loaded corpus");
        Ok(corpus)
    }

    fn from_records(records: Vec<Value>) -> Result<Self, CorpusError> {
        let documents = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Document::from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_documents(documents)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.positions.get(id).map(|&pos| &self.documents[pos])
    }

    /// Look up an id given as text, trying the integer form first.
    pub fn get_str(&self, id: &str) -> Option<&Document> {
        id.parse::<i64>()
            .ok()
            .and_then(|n| self.get(&DocumentId::Int(n)))
            .or_else(|| self.get(&DocumentId::Text(id.to_string())))
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

fn read_json(file: &Path, records: &mut Vec<Value>) -> Result<(), CorpusError> {
    let f = File::open(file).map_err(|source| CorpusError::Io { path: file.to_path_buf(), source })?;
    let json: Value = serde_json::from_reader(BufReader::new(f))
        .map_err(|source| CorpusError::Json { path: file.to_path_buf(), source })?;
    push_records(json, records)
}

fn push_records(json: Value, records: &mut Vec<Value>) -> Result<(), CorpusError> {
    match json {
        Value::Array(arr) => records.extend(arr),
        Value::Object(_) => records.push(json),
        Value::Null => return Err(CorpusError::NotAnArray("null")),
        Value::Bool(_) => return Err(CorpusError::NotAnArray("a boolean")),
        Value::Number(_) => return Err(CorpusError::NotAnArray("a number")),
        Value::String(_) => return Err(CorpusError::NotAnArray("a string")),
    }
    Ok(())
}

fn read_jsonl(file: &Path, records: &mut Vec<Value>) -> Result<(), CorpusError> {
    let f = File::open(file).map_err(|source| CorpusError::Io { path: file.to_path_buf(), source })?;
    for line in BufReader::new(f).lines() {
        let line = line.map_err(|source| CorpusError::Io { path: file.to_path_buf(), source })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|source| CorpusError::Json { path: file.to_path_buf(), source })?;
        records.push(record);
    }
    Ok(())
}

/// A corpus with every document already tokenized and stopword-filtered.
///
/// Built by [`crate::Engine::prepare`]. Token lists are independent of the
/// query and can be reused; IDF is only stored here in corpus-only mode.
#[derive(Debug, Clone, Default)]
pub struct PreparedCorpus {
    corpus: Corpus,
    tokens: Vec<Vec<String>>,
    corpus_idf: Option<IdfMap>,
}

impl PreparedCorpus {
    pub(crate) fn new(corpus: Corpus, tokens: Vec<Vec<String>>, corpus_idf: Option<IdfMap>) -> Self {
        Self { corpus, tokens, corpus_idf }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn tokens(&self) -> &[Vec<String>] {
        &self.tokens
    }

    pub fn corpus_idf(&self) -> Option<&IdfMap> {
        self.corpus_idf.as_ref()
    }

    pub fn into_corpus(self) -> Corpus {
        self.corpus
    }
}
