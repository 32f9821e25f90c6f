use std::collections::{HashMap, HashSet};

use crate::config::IdfWeighting;

/// Inverse document frequency per token, plus the pseudo-document count it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdfMap {
    weights: HashMap<String, f64>,
    total_documents: usize,
}

impl IdfMap {
    pub fn get(&self, term: &str) -> Option<f64> {
        self.weights.get(term).copied()
    }

    pub fn total_documents(&self) -> usize {
        self.total_documents
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }
}

/// Count, for each token, how many of `documents` contain it at least once.
/// Returns the counts and the number of documents seen.
pub fn document_frequency<'a, I>(documents: I) -> (HashMap<&'a str, u32>, usize)
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut df: HashMap<&'a str, u32> = HashMap::new();
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut total = 0usize;
    for doc in documents {
        total += 1;
        seen.clear();
        for token in doc {
            if seen.insert(token.as_str()) {
                *df.entry(token.as_str()).or_insert(0) += 1;
            }
        }
    }
    (df, total)
}

pub fn build_idf<'a, I>(documents: I, weighting: IdfWeighting) -> IdfMap
where
    I: IntoIterator<Item = &'a [String]>,
{
    let (df, total) = document_frequency(documents);
    let weights = df
        .into_iter()
        .map(|(term, n)| (term.to_string(), weighting.idf(total, n)))
        .collect();
    IdfMap { weights, total_documents: total }
}

/// IDF over the query (as one extra pseudo-document) and every document.
pub fn build_query_idf(query: &[String], documents: &[Vec<String>], weighting: IdfWeighting) -> IdfMap {
    build_idf(
        std::iter::once(query).chain(documents.iter().map(Vec::as_slice)),
        weighting,
    )
}
