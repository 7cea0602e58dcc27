//! Query tokenization for the full-text signal.
//!
//! Queries arrive as free-form natural language, mostly Chinese, so
//! whitespace splitting is useless; jieba does the word segmentation.
//! Request filler ("想听", "推荐", ...) and grammatical particles carry
//! no lexical signal and are stripped before the tokens become a
//! disjunctive full-text predicate.

use jieba_rs::Jieba;
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = [
        // Request filler
        "想听", "给我", "推荐", "一首", "有些", "听听", "有关", "关于",
        "那些", "适合", "那种", "一种",
        // Particles and pronouns
        "的", "了", "在", "我", "你", "他", "她", "歌",
        // Punctuation that jieba emits as tokens
        "，", "。", "！", "？", ",", ".", "!", "?", " ",
        // English request filler
        "recommend", "play", "song", "songs", "some", "want", "listen",
        "the", "a", "an",
    ]
    .into_iter()
    .collect();
}

/// Splits a query into content words for the lexical predicate.
pub struct LexicalAnalyzer {
    jieba: Jieba,
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self {
            jieba: Jieba::new(),
        }
    }

    /// Tokenize a query into content words.
    ///
    /// Drops stop-words, punctuation-only tokens and single-character
    /// tokens. If that removes everything, the unfiltered token sequence
    /// is returned instead: a non-empty query never tokenizes to nothing.
    pub fn tokenize(&self, query: &str) -> Vec<String> {
        let words: Vec<String> = self
            .jieba
            .cut(query, false)
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let cleaned: Vec<String> = words
            .iter()
            .filter(|w| !STOP_WORDS.contains(w.as_str()))
            .filter(|w| w.chars().count() > 1)
            .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
            .cloned()
            .collect();

        if cleaned.is_empty() {
            words
        } else {
            cleaned
        }
    }

    /// Join tokens into a disjunctive FTS5 MATCH predicate.
    ///
    /// Each token is double-quoted with embedded quotes doubled, so user
    /// input cannot inject FTS5 query syntax. Returns `None` for an empty
    /// token list (no lexical signal for this query).
    pub fn fts_predicate(tokens: &[String]) -> Option<String> {
        if tokens.is_empty() {
            return None;
        }
        let quoted: Vec<String> = tokens
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
            .collect();
        Some(quoted.join(" OR "))
    }
}
