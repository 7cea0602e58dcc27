//! SongStore trait definition.
//!
//! Abstracts the storage collaborator so the search core and the HTTP
//! layer never depend on a concrete backend (and tests can use an
//! in-memory fake).

use anyhow::Result;

use super::models::Song;
use crate::search::SignalRow;

/// Storage backend for the song catalog and its signal columns.
pub trait SongStore: Send + Sync {
    /// Compute raw relevance signals for every eligible song against one
    /// query.
    ///
    /// For each song with a review vector and `excluded = false` this
    /// returns the cosine similarities of `query_vector` against the
    /// review and lyrics embeddings (the latter 0 when absent) and the
    /// raw lexical score: full-text rank over the token predicate plus
    /// exact-substring bonuses for `artist` / `title` when provided.
    ///
    /// Admission thresholds, weighting and ordering are the ranker's
    /// concern; rows come back unordered and unfiltered.
    fn search_signals(
        &self,
        query_vector: &[f32],
        lexical_tokens: &[String],
        artist: Option<&str>,
        title: Option<&str>,
    ) -> Result<Vec<SignalRow>>;

    /// Fetch one song with all signal columns.
    fn get_song(&self, id: &str) -> Result<Option<Song>>;

    /// All eligible songs except `exclude_id`, with vectors and TF-IDF
    /// terms loaded, for recommendation scoring.
    fn recommend_candidates(&self, exclude_id: &str) -> Result<Vec<Song>>;

    /// Random eligible songs with a review, for the discovery page.
    fn random_songs(&self, count: usize) -> Result<Vec<Song>>;

    /// Insert or replace songs and keep the full-text index in sync.
    fn upsert_songs(&self, songs: &[Song]) -> Result<()>;

    /// Total number of songs (including excluded ones).
    fn count_songs(&self) -> Result<usize>;
}
