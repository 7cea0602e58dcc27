//! Shared signal and result types for hybrid search.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What kind of match the user is after, as classified from the raw query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentCategory {
    /// The query names a specific artist and/or title.
    Exact,
    /// The query looks like a lyric fragment.
    Lyrics,
    /// Mood/scene description, the default.
    Vibe,
}

impl IntentCategory {
    /// Parse a category string from the intent service.
    ///
    /// Anything unrecognized falls back to `Vibe` so a misbehaving
    /// classifier can never break a query.
    pub fn parse_or_vibe(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "exact" => Self::Exact,
            "lyrics" => Self::Lyrics,
            _ => Self::Vibe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Lyrics => "lyrics",
            Self::Vibe => "vibe",
        }
    }
}

/// Structured search intent extracted from a raw query.
///
/// Never persisted; one per request. `vibe` is never empty: when
/// classification fails it carries the raw query text.
#[derive(Debug, Clone)]
pub struct Intent {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub vibe: String,
    pub category: IntentCategory,
}

impl Intent {
    /// The degraded intent used when the classifier is unavailable or
    /// returns garbage: plain vibe search over the raw query.
    pub fn degraded(query: &str) -> Self {
        Self {
            artist: None,
            title: None,
            vibe: query.to_string(),
            category: IntentCategory::Vibe,
        }
    }
}

/// Per-signal fusion weights for one intent category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightVector {
    /// Weight of the review-embedding similarity.
    pub review: f64,
    /// Weight of the core-lyrics-embedding similarity.
    pub lyrics: f64,
    /// Weight of the normalized lexical score.
    pub lexical: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        // Vibe weights; the other categories are configured in FusionConfig.
        Self {
            review: 0.6,
            lyrics: 0.2,
            lexical: 0.2,
        }
    }
}

/// Raw per-candidate signal values, as delivered by the signal store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalScores {
    /// Cosine similarity of the query vector against the review embedding.
    pub review: f64,
    /// Cosine similarity against the core-lyrics embedding, 0 when the
    /// candidate has no lyrics vector.
    pub lyrics: f64,
    /// Unbounded non-negative lexical score: full-text rank plus discrete
    /// artist/title exact-substring bonuses. For recommendations this slot
    /// carries the TF-IDF keyword overlap instead.
    pub lexical: f64,
}

/// One candidate as returned by the signal store, before fusion.
#[derive(Debug, Clone)]
pub struct SignalRow {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_cover: Option<String>,
    pub review_text: Option<String>,
    pub vibe_tags: Option<Vec<String>>,
    pub core_lyrics: Option<String>,
    pub signals: SignalScores,
}

/// A candidate with its fused score, ready to be returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_cover: Option<String>,
    pub review_text: Option<String>,
    pub vibe_tags: Option<Vec<String>>,
    pub core_lyrics: Option<String>,
    /// Fused relevance score.
    pub score: f64,
    /// Individual signal sub-scores, for explainability.
    pub signals: SignalScores,
}

/// Errors surfaced by the search core.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Rejected before any remote call was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An upstream collaborator (embedding service, signal store) failed.
    /// Fatal to the current query, never retried here.
    #[error("{service} unavailable: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// The caller referenced an id that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched dimensions or zero-norm inputs, so a
/// malformed stored vector degrades to "no similarity" instead of NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
