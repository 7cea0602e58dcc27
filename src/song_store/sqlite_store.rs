//! SQLite-backed song store.
//!
//! One `songs` table holds the catalog with its vector columns (f32 LE
//! blobs) and an FTS5 companion table provides the full-text rank for
//! the lexical signal. Cosine similarities are computed in process: the
//! catalog is a few tens of thousands of rows, a brute-force scan per
//! query is well within budget and avoids an external vector index.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::search::{cosine_similarity, LexicalAnalyzer, SignalRow, SignalScores};

use super::models::Song;
use super::trait_def::SongStore;
use super::vector::{decode_vector, encode_vector};

const SCHEMA_VERSION: i64 = 1;

/// Discrete bonuses folded into the raw lexical score when the
/// classified artist/title is an exact substring of the song's fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalBonuses {
    pub artist: f64,
    pub title: f64,
}

impl Default for LexicalBonuses {
    fn default() -> Self {
        Self {
            artist: 4.0,
            title: 3.0,
        }
    }
}

/// SQLite song store with an FTS5 lexical index.
pub struct SqliteSongStore {
    conn: Mutex<Connection>,
    bonuses: LexicalBonuses,
}

impl SqliteSongStore {
    pub fn new(db_path: &Path, bonuses: LexicalBonuses) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open song database at {:?}", db_path))?;

        // WAL for concurrent readers while the ingestion side writes.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        match version {
            0 => {
                Self::create_schema(&conn)?;
                conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
                info!(db_path = ?db_path, "Initialized song database schema");
            }
            SCHEMA_VERSION => {}
            other => bail!(
                "Unsupported song database schema version {} (expected {})",
                other,
                SCHEMA_VERSION
            ),
        }

        Ok(Self {
            conn: Mutex::new(conn),
            bonuses,
        })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS songs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                album_cover TEXT,
                lyrics TEXT,
                segmented_lyrics TEXT,
                review_text TEXT,
                vibe_tags TEXT,
                recommend_scene TEXT,
                core_lyrics TEXT,
                review_vector BLOB,
                lyrics_vector BLOB,
                tfidf_terms TEXT,
                excluded INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS songs_fts USING fts5(
                song_id UNINDEXED,
                lexical_text,
                tokenize='unicode61'
            );
        "#,
        )?;
        Ok(())
    }

    /// Full-text ranks for one disjunctive predicate, song_id -> rank.
    /// FTS5 bm25 is negative-better, so it is negated into a
    /// non-negative "higher is better" rank; non-matching songs are
    /// simply absent.
    fn lexical_ranks(conn: &Connection, predicate: &str) -> Result<HashMap<String, f64>> {
        let mut stmt = conn.prepare(
            "SELECT song_id, -bm25(songs_fts) FROM songs_fts WHERE songs_fts MATCH ?1",
        )?;
        let mut ranks = HashMap::new();
        let rows = stmt.query_map([predicate], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        for row in rows {
            let (song_id, rank) = row?;
            ranks.insert(song_id, rank.max(0.0));
        }
        Ok(ranks)
    }

    fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Raw column values before JSON/vector decoding.
struct RawSongRow {
    id: String,
    title: String,
    artist: String,
    album_cover: Option<String>,
    lyrics: Option<String>,
    segmented_lyrics: Option<String>,
    review_text: Option<String>,
    vibe_tags: Option<String>,
    recommend_scene: Option<String>,
    core_lyrics: Option<String>,
    review_vector: Option<Vec<u8>>,
    lyrics_vector: Option<Vec<u8>>,
    tfidf_terms: Option<String>,
    excluded: bool,
    created_at: String,
    updated_at: String,
}

const SONG_COLUMNS: &str = "id, title, artist, album_cover, lyrics, segmented_lyrics, \
     review_text, vibe_tags, recommend_scene, core_lyrics, \
     review_vector, lyrics_vector, tfidf_terms, excluded, created_at, updated_at";

fn raw_song_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawSongRow> {
    Ok(RawSongRow {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        album_cover: row.get(3)?,
        lyrics: row.get(4)?,
        segmented_lyrics: row.get(5)?,
        review_text: row.get(6)?,
        vibe_tags: row.get(7)?,
        recommend_scene: row.get(8)?,
        core_lyrics: row.get(9)?,
        review_vector: row.get(10)?,
        lyrics_vector: row.get(11)?,
        tfidf_terms: row.get(12)?,
        excluded: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

impl TryFrom<RawSongRow> for Song {
    type Error = anyhow::Error;

    fn try_from(raw: RawSongRow) -> Result<Self> {
        let parse_time = |s: &str| -> Result<DateTime<Utc>> {
            Ok(DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("Invalid timestamp: {}", s))?
                .with_timezone(&Utc))
        };

        Ok(Song {
            review_vector: raw
                .review_vector
                .as_deref()
                .map(decode_vector)
                .transpose()?,
            lyrics_vector: raw
                .lyrics_vector
                .as_deref()
                .map(decode_vector)
                .transpose()?,
            vibe_tags: raw
                .vibe_tags
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("Invalid vibe_tags JSON")?,
            tfidf_terms: raw
                .tfidf_terms
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("Invalid tfidf_terms JSON")?,
            created_at: parse_time(&raw.created_at)?,
            updated_at: parse_time(&raw.updated_at)?,
            id: raw.id,
            title: raw.title,
            artist: raw.artist,
            album_cover: raw.album_cover,
            lyrics: raw.lyrics,
            segmented_lyrics: raw.segmented_lyrics,
            review_text: raw.review_text,
            recommend_scene: raw.recommend_scene,
            core_lyrics: raw.core_lyrics,
            excluded: raw.excluded,
        })
    }
}

impl SongStore for SqliteSongStore {
    fn search_signals(
        &self,
        query_vector: &[f32],
        lexical_tokens: &[String],
        artist: Option<&str>,
        title: Option<&str>,
    ) -> Result<Vec<SignalRow>> {
        let conn = self.conn.lock().unwrap();

        let ranks = match LexicalAnalyzer::fts_predicate(lexical_tokens) {
            Some(predicate) => Self::lexical_ranks(&conn, &predicate)?,
            None => HashMap::new(),
        };

        let mut stmt = conn.prepare(
            "SELECT id, title, artist, album_cover, review_text, vibe_tags, core_lyrics, \
                    review_vector, lyrics_vector \
             FROM songs WHERE excluded = 0 AND review_vector IS NOT NULL",
        )?;

        struct Candidate {
            id: String,
            title: String,
            artist: String,
            album_cover: Option<String>,
            review_text: Option<String>,
            vibe_tags: Option<String>,
            core_lyrics: Option<String>,
            review_vector: Vec<u8>,
            lyrics_vector: Option<Vec<u8>>,
        }

        let candidates = stmt
            .query_map([], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    album_cover: row.get(3)?,
                    review_text: row.get(4)?,
                    vibe_tags: row.get(5)?,
                    core_lyrics: row.get(6)?,
                    review_vector: row.get(7)?,
                    lyrics_vector: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let review_vec = decode_vector(&candidate.review_vector)?;
            let review_sim = cosine_similarity(query_vector, &review_vec);
            let lyrics_sim = candidate
                .lyrics_vector
                .as_deref()
                .map(decode_vector)
                .transpose()?
                .map(|v| cosine_similarity(query_vector, &v))
                .unwrap_or(0.0);

            let mut lexical = ranks.get(&candidate.id).copied().unwrap_or(0.0);
            if let Some(artist_query) = artist {
                if Self::contains_ignore_case(&candidate.artist, artist_query) {
                    lexical += self.bonuses.artist;
                }
            }
            if let Some(title_query) = title {
                if Self::contains_ignore_case(&candidate.title, title_query) {
                    lexical += self.bonuses.title;
                }
            }

            rows.push(SignalRow {
                id: candidate.id,
                title: candidate.title,
                artist: candidate.artist,
                album_cover: candidate.album_cover,
                review_text: candidate.review_text,
                vibe_tags: candidate
                    .vibe_tags
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()
                    .context("Invalid vibe_tags JSON")?,
                core_lyrics: candidate.core_lyrics,
                signals: SignalScores {
                    review: review_sim,
                    lyrics: lyrics_sim,
                    lexical,
                },
            });
        }

        debug!(
            candidates = rows.len(),
            fts_matches = ranks.len(),
            "Gathered raw search signals"
        );
        Ok(rows)
    }

    fn get_song(&self, id: &str) -> Result<Option<Song>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM songs WHERE id = ?1",
            SONG_COLUMNS
        ))?;
        let mut rows = stmt.query_map([id], raw_song_from_row)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw?.try_into()?)),
            None => Ok(None),
        }
    }

    fn recommend_candidates(&self, exclude_id: &str) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM songs \
             WHERE id != ?1 AND excluded = 0 AND review_vector IS NOT NULL",
            SONG_COLUMNS
        ))?;
        let raws = stmt
            .query_map([exclude_id], raw_song_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(Song::try_from).collect()
    }

    fn random_songs(&self, count: usize) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM songs \
             WHERE excluded = 0 AND review_text IS NOT NULL \
             ORDER BY RANDOM() LIMIT ?1",
            SONG_COLUMNS
        ))?;
        let raws = stmt
            .query_map([count], raw_song_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(Song::try_from).collect()
    }

    fn upsert_songs(&self, songs: &[Song]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT OR REPLACE INTO songs \
                 (id, title, artist, album_cover, lyrics, segmented_lyrics, review_text, \
                  vibe_tags, recommend_scene, core_lyrics, review_vector, lyrics_vector, \
                  tfidf_terms, excluded, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;
            let mut delete_fts = tx.prepare("DELETE FROM songs_fts WHERE song_id = ?1")?;
            let mut insert_fts =
                tx.prepare("INSERT INTO songs_fts (song_id, lexical_text) VALUES (?1, ?2)")?;

            for song in songs {
                let vibe_tags = song
                    .vibe_tags
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                let tfidf_terms = song
                    .tfidf_terms
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;

                upsert.execute(rusqlite::params![
                    song.id,
                    song.title,
                    song.artist,
                    song.album_cover,
                    song.lyrics,
                    song.segmented_lyrics,
                    song.review_text,
                    vibe_tags,
                    song.recommend_scene,
                    song.core_lyrics,
                    song.review_vector.as_deref().map(encode_vector),
                    song.lyrics_vector.as_deref().map(encode_vector),
                    tfidf_terms,
                    song.excluded,
                    song.created_at.to_rfc3339(),
                    song.updated_at.to_rfc3339(),
                ])?;

                delete_fts.execute([&song.id])?;
                insert_fts.execute(rusqlite::params![song.id, song.lexical_text()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn count_songs(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
