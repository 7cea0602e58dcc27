//! Song model shared between the store and the search core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A catalog song with its AI-derived signal columns.
///
/// Populated by the offline ingestion pipeline; read-only to the search
/// core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    /// Upstream catalog id (opaque string).
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_cover: Option<String>,

    /// Raw lyrics as crawled.
    pub lyrics: Option<String>,
    /// Pre-segmented lyrics, space-joined, used for full-text indexing.
    pub segmented_lyrics: Option<String>,
    /// LLM-written vibe review of the song.
    pub review_text: Option<String>,
    /// LLM-extracted mood tags.
    pub vibe_tags: Option<Vec<String>>,
    /// LLM-suggested listening scene.
    pub recommend_scene: Option<String>,
    /// Extracted chorus / most representative lyric lines.
    pub core_lyrics: Option<String>,

    /// Embedding of `review_text` (1024 dims). Required for eligibility.
    pub review_vector: Option<Vec<f32>>,
    /// Embedding of `core_lyrics` (1024 dims).
    pub lyrics_vector: Option<Vec<f32>>,
    /// Top TF-IDF terms of the lyrics, term -> weight.
    pub tfidf_terms: Option<HashMap<String, f64>>,

    /// Near-duplicate / cover version flag; excluded songs are never
    /// surfaced.
    pub excluded: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Song {
    /// Whether this song can appear in search or recommendation results.
    pub fn is_eligible(&self) -> bool {
        self.review_vector.is_some() && !self.excluded
    }

    /// Text the full-text index covers: title, artist and segmented lyrics.
    pub fn lexical_text(&self) -> String {
        match &self.segmented_lyrics {
            Some(lyrics) => format!("{} {} {}", self.title, self.artist, lyrics),
            None => format!("{} {}", self.title, self.artist),
        }
    }
}

/// Compact song representation for list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SongSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_cover: Option<String>,
}

impl From<&Song> for SongSummary {
    fn from(song: &Song) -> Self {
        Self {
            id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            album_cover: song.album_cover.clone(),
        }
    }
}
