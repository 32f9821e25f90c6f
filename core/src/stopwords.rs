use lazy_static::lazy_static;
use std::collections::HashSet;

const ENGLISH: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
    "of", "with", "by", "from", "as", "is", "was", "are", "were", "been",
    "be", "have", "has", "had", "do", "does", "did", "will", "would",
];

// Korean particles and pronouns plus nouns that appear in nearly every record.
const KOREAN: &[&str] = &[
    "이", "그", "저", "것", "수", "등", "및", "위한", "있는", "하는", "되는",
    "관련", "장비", "시스템", "기술", "설계", "제조",
];

lazy_static! {
    static ref BUILTIN: StopwordSet = StopwordSet::builtin();
}

/// Immutable set of tokens removed before weighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn builtin() -> Self {
        let words = ENGLISH.iter().chain(KOREAN).map(|w| w.to_string()).collect();
        Self { words }
    }

    /// The process-wide built-in set.
    pub fn shared() -> &'static StopwordSet {
        &BUILTIN
    }

    /// Built-in words plus `extra`, lowercased and trimmed.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::builtin();
        for word in extra {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() {
                set.words.insert(word);
            }
        }
        set
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().filter(|t| !self.contains(t)).collect()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopwordSet {
    fn default() -> Self {
        Self::builtin()
    }
}
