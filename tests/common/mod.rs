//! Common test infrastructure
//!
//! Builds a full in-process application: a real SQLite song store in a
//! temporary directory, wired to stubbed LLM and embedding services so no
//! test touches the network.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use vibecheck_server::embedding::{EmbedError, Embedder};
use vibecheck_server::llm::{
    CompletionOptions, CompletionResponse, LlmError, LlmProvider, Message,
};
use vibecheck_server::search::{
    IntentClassifier, QueryPipeline, RecommendWeights, RecommendationScorer, SignalFusionRanker,
};
use vibecheck_server::song_store::{LexicalBonuses, Song, SongStore, SqliteSongStore};
use vibecheck_server::{make_app, ServerState};

/// LLM provider returning a canned intent classification.
pub struct StubProvider {
    pub content: String,
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }
    fn model(&self) -> &str {
        "stub"
    }
    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: self.content.clone(),
        })
    }
    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Embedder returning a fixed query vector.
pub struct StubEmbedder {
    pub vector: Vec<f32>,
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.vector.clone())
    }
    fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Embedder that always fails, for upstream error tests.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Timeout)
    }
    fn dimension(&self) -> usize {
        0
    }
}

pub struct TestApp {
    pub router: axum::Router,
    // Held so the database outlives the test.
    _db_dir: TempDir,
}

impl TestApp {
    /// Build an application over `songs` with a canned intent response and
    /// a fixed query embedding.
    pub fn new(songs: &[Song], intent_json: &str, query_vector: Vec<f32>) -> Self {
        Self::with_embedder(
            songs,
            intent_json,
            Arc::new(StubEmbedder {
                vector: query_vector,
            }),
        )
    }

    pub fn with_embedder(
        songs: &[Song],
        intent_json: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let db_dir = TempDir::new().unwrap();
        let store = SqliteSongStore::new(
            &db_dir.path().join("songs.db"),
            LexicalBonuses::default(),
        )
        .unwrap();
        store.upsert_songs(songs).unwrap();
        let store: Arc<dyn SongStore> = Arc::new(store);

        let pipeline = Arc::new(QueryPipeline::new(
            IntentClassifier::new(Arc::new(StubProvider {
                content: intent_json.to_string(),
            })),
            embedder,
            store.clone(),
            SignalFusionRanker::default(),
        ));
        let scorer = Arc::new(RecommendationScorer::new(RecommendWeights::default()));

        let state = ServerState::new(pipeline, scorer, store);
        Self {
            router: make_app(state, None),
            _db_dir: db_dir,
        }
    }

    /// GET a path and return status plus parsed JSON body.
    pub async fn get(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // Extractor rejections produce plain-text bodies; wrap those as a
        // JSON string so assertions stay uniform.
        let json = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
        (status, json)
    }
}

/// A fully populated, eligible song.
pub fn make_song(id: &str, title: &str, artist: &str, review_vector: Vec<f32>) -> Song {
    Song {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album_cover: Some(format!("https://covers.example/{}.jpg", id)),
        lyrics: None,
        segmented_lyrics: None,
        review_text: Some(format!("review of {}", title)),
        vibe_tags: Some(vec!["安静".to_string()]),
        recommend_scene: None,
        core_lyrics: None,
        review_vector: Some(review_vector),
        lyrics_vector: None,
        tfidf_terms: None,
        excluded: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub const VIBE_INTENT: &str =
    r#"{"artist": null, "title": null, "vibe": "安静的歌", "type": "vibe"}"#;
