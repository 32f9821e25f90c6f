use std::collections::BTreeMap;

use crate::stats::IdfMap;

/// Raw occurrence count per token.
pub fn term_counts(tokens: &[String]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Occurrence count divided by the total token count.
pub fn term_frequency(tokens: &[String]) -> BTreeMap<&str, f64> {
    let total = tokens.len() as f64;
    term_counts(tokens)
        .into_iter()
        .map(|(term, count)| (term, count as f64 / total))
        .collect()
}

/// Sparse TF-IDF weights. An absent token has weight zero.
///
/// Keys borrow from the token slice the vector was built from. Ordered keys
/// keep floating-point accumulation order, and therefore scores, identical
/// between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightVector<'a> {
    weights: BTreeMap<&'a str, f64>,
}

impl<'a> WeightVector<'a> {
    pub fn build(tokens: &'a [String], idf: &IdfMap) -> Self {
        if tokens.is_empty() {
            return Self::default();
        }
        let weights = term_frequency(tokens)
            .into_iter()
            .map(|(term, tf)| (term, tf * idf.get(term).unwrap_or(0.0)))
            .collect();
        Self { weights }
    }

    pub fn get(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + '_ {
        self.weights.iter().map(|(t, w)| (*t, *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn squared_norm(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum()
    }
}
