use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::stopwords::StopwordSet;

lazy_static! {
    // Hangul jamo (ㄱ-ㅎ) and syllables (가-힣) are listed explicitly alongside \w.
    static ref PUNCT: Regex =
        Regex::new(r"[^\w\s\x{3131}-\x{314E}\x{AC00}-\x{D7A3}]").expect("valid regex");
}

/// Tokenize text into lowercase word tokens.
///
/// Every character that is not a word character, whitespace or Hangul is
/// replaced by a space, the result is split on whitespace and tokens
/// shorter than two characters are dropped. Order is preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let lowered = text.to_lowercase();
    let cleaned = PUNCT.replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Tokenizer with optional NFKC compatibility folding applied before [`tokenize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tokenizer {
    pub unicode_fold: bool,
}

impl Tokenizer {
    pub fn new(unicode_fold: bool) -> Self {
        Self { unicode_fold }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        if self.unicode_fold {
            tokenize(&text.nfkc().collect::<String>())
        } else {
            tokenize(text)
        }
    }

    /// Tokenize and drop stopwords. This is the pipeline applied to queries and documents alike.
    pub fn analyze(&self, text: &str, stopwords: &StopwordSet) -> Vec<String> {
        stopwords.filter(self.tokenize(text))
    }
}
