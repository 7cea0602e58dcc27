//! End-to-end query pipeline.
//!
//! Orchestrates one search request: validate, classify intent, tokenize,
//! embed the vibe phrase, gather raw signals from the store and fuse them
//! into a ranked result list. The classifier degrades silently; embedding
//! and storage failures are fatal to the request.

use std::sync::Arc;
use serde::Serialize;
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::song_store::SongStore;

use super::fusion::SignalFusionRanker;
use super::intent::IntentClassifier;
use super::lexical::LexicalAnalyzer;
use super::types::{ScoredCandidate, SearchError};

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 200;
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 50;
pub const DEFAULT_TOP_K: usize = 10;

/// One completed search, ready for serialization.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// The query as processed (trimmed).
    pub query: String,
    /// Category the intent classifier routed this query to.
    pub intent_type: &'static str,
    pub results: Vec<ScoredCandidate>,
}

/// Wires the search collaborators together.
pub struct QueryPipeline {
    classifier: IntentClassifier,
    lexical: LexicalAnalyzer,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn SongStore>,
    ranker: SignalFusionRanker,
}

impl QueryPipeline {
    pub fn new(
        classifier: IntentClassifier,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn SongStore>,
        ranker: SignalFusionRanker,
    ) -> Self {
        Self {
            classifier,
            lexical: LexicalAnalyzer::new(),
            embedder,
            store,
            ranker,
        }
    }

    /// Run one query through the full pipeline.
    ///
    /// Input validation happens before any remote call, so an invalid
    /// request costs nothing upstream.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<SearchResponse, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidInput("query must not be empty".into()));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(SearchError::InvalidInput(format!(
                "query exceeds {} characters",
                MAX_QUERY_CHARS
            )));
        }
        if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
            return Err(SearchError::InvalidInput(format!(
                "top_k must be between {} and {}",
                MIN_TOP_K, MAX_TOP_K
            )));
        }

        let intent = self.classifier.classify(query).await;
        let tokens = self.lexical.tokenize(query);
        debug!(query = %query, tokens = ?tokens, "Query tokenized");

        let query_vector =
            self.embedder
                .embed(&intent.vibe)
                .await
                .map_err(|e| SearchError::Upstream {
                    service: "embedding service",
                    message: e.to_string(),
                })?;

        let rows = self
            .store
            .search_signals(
                &query_vector,
                &tokens,
                intent.artist.as_deref(),
                intent.title.as_deref(),
            )
            .map_err(|e| SearchError::Upstream {
                service: "song store",
                message: e.to_string(),
            })?;

        let candidates = rows.len();
        let results = self.ranker.rank(intent.category, rows, top_k);
        info!(
            query = %query,
            category = intent.category.as_str(),
            candidates,
            results = results.len(),
            "Search completed"
        );

        Ok(SearchResponse {
            query: query.to_string(),
            intent_type: intent.category.as_str(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedError;
    use crate::llm::{
        CompletionOptions, CompletionResponse, LlmError, LlmProvider, Message,
    };
    use crate::search::types::{SignalRow, SignalScores};
    use crate::song_store::Song;
    use anyhow::Result;
    use async_trait::async_trait;

    struct StaticProvider {
        content: String,
    }

    #[async_trait]
    impl LlmProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }
        fn model(&self) -> &str {
            "static"
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

    struct StaticEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl Embedder for StaticEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(self.vector.clone())
        }
        fn dimension(&self) -> usize {
            self.vector.len()
        }
    }

    /// Embedder that panics on use, proving validation short-circuits.
    struct PanickingEmbedder;

    #[async_trait]
    impl Embedder for PanickingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            panic!("embed called for a request that should have been rejected");
        }
        fn dimension(&self) -> usize {
            0
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Timeout)
        }
        fn dimension(&self) -> usize {
            0
        }
    }

    /// Store serving canned signal rows and recording the last call.
    struct StubStore {
        rows: Vec<SignalRow>,
    }

    impl SongStore for StubStore {
        fn search_signals(
            &self,
            _query_vector: &[f32],
            _lexical_tokens: &[String],
            _artist: Option<&str>,
            _title: Option<&str>,
        ) -> Result<Vec<SignalRow>> {
            Ok(self.rows.clone())
        }
        fn get_song(&self, _id: &str) -> Result<Option<Song>> {
            Ok(None)
        }
        fn recommend_candidates(&self, _exclude_id: &str) -> Result<Vec<Song>> {
            Ok(Vec::new())
        }
        fn random_songs(&self, _count: usize) -> Result<Vec<Song>> {
            Ok(Vec::new())
        }
        fn upsert_songs(&self, _songs: &[Song]) -> Result<()> {
            Ok(())
        }
        fn count_songs(&self) -> Result<usize> {
            Ok(self.rows.len())
        }
    }

    fn make_row(id: &str, review: f64) -> SignalRow {
        SignalRow {
            id: id.to_string(),
            title: format!("title_{}", id),
            artist: format!("artist_{}", id),
            album_cover: None,
            review_text: None,
            vibe_tags: None,
            core_lyrics: None,
            signals: SignalScores {
                review,
                lyrics: 0.0,
                lexical: 0.0,
            },
        }
    }

    fn make_pipeline(
        provider_content: &str,
        embedder: Arc<dyn Embedder>,
        rows: Vec<SignalRow>,
    ) -> QueryPipeline {
        QueryPipeline::new(
            IntentClassifier::new(Arc::new(StaticProvider {
                content: provider_content.to_string(),
            })),
            embedder,
            Arc::new(StubStore { rows }),
            SignalFusionRanker::default(),
        )
    }

    const VIBE_INTENT: &str = r#"{"artist": null, "title": null, "vibe": "伤感", "type": "vibe"}"#;

    #[tokio::test]
    async fn test_search_happy_path() {
        let pipeline = make_pipeline(
            VIBE_INTENT,
            Arc::new(StaticEmbedder {
                vector: vec![1.0, 0.0],
            }),
            vec![make_row("a", 0.9), make_row("b", 0.5)],
        );

        let response = pipeline.search("伤感的歌", 10).await.unwrap();
        assert_eq!(response.intent_type, "vibe");
        assert_eq!(response.query, "伤感的歌");
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].id, "a");
    }

    #[tokio::test]
    async fn test_threshold_filters_results() {
        let pipeline = make_pipeline(
            VIBE_INTENT,
            Arc::new(StaticEmbedder {
                vector: vec![1.0, 0.0],
            }),
            vec![make_row("weak", 0.2), make_row("strong", 0.8)],
        );

        let response = pipeline.search("伤感的歌", 10).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "strong");
    }

    #[tokio::test]
    async fn test_validation_precedes_remote_calls() {
        let pipeline = make_pipeline(VIBE_INTENT, Arc::new(PanickingEmbedder), Vec::new());

        let empty = pipeline.search("   ", 10).await;
        assert!(matches!(empty, Err(SearchError::InvalidInput(_))));

        let long_query = "长".repeat(MAX_QUERY_CHARS + 1);
        let too_long = pipeline.search(&long_query, 10).await;
        assert!(matches!(too_long, Err(SearchError::InvalidInput(_))));

        let bad_top_k = pipeline.search("伤感的歌", 0).await;
        assert!(matches!(bad_top_k, Err(SearchError::InvalidInput(_))));

        let huge_top_k = pipeline.search("伤感的歌", MAX_TOP_K + 1).await;
        assert!(matches!(huge_top_k, Err(SearchError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_top_k_bounds_inclusive() {
        let pipeline = make_pipeline(
            VIBE_INTENT,
            Arc::new(StaticEmbedder {
                vector: vec![1.0, 0.0],
            }),
            vec![make_row("a", 0.9)],
        );

        assert!(pipeline.search("伤感的歌", MIN_TOP_K).await.is_ok());
        assert!(pipeline.search("伤感的歌", MAX_TOP_K).await.is_ok());
    }

    #[tokio::test]
    async fn test_max_length_query_accepted() {
        let pipeline = make_pipeline(
            VIBE_INTENT,
            Arc::new(StaticEmbedder {
                vector: vec![1.0, 0.0],
            }),
            Vec::new(),
        );
        let query = "长".repeat(MAX_QUERY_CHARS);
        assert!(pipeline.search(&query, 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_upstream_error() {
        let pipeline = make_pipeline(VIBE_INTENT, Arc::new(FailingEmbedder), Vec::new());
        let result = pipeline.search("伤感的歌", 10).await;
        assert!(matches!(
            result,
            Err(SearchError::Upstream {
                service: "embedding service",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_classifier_failure_still_searches() {
        // Unparseable intent response degrades to vibe and the pipeline
        // carries on.
        let pipeline = make_pipeline(
            "not json at all",
            Arc::new(StaticEmbedder {
                vector: vec![1.0, 0.0],
            }),
            vec![make_row("a", 0.9)],
        );

        let response = pipeline.search("下雨天的歌", 10).await.unwrap();
        assert_eq!(response.intent_type, "vibe");
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn test_truncates_to_top_k() {
        let rows = (0..10).map(|i| make_row(&format!("id{}", i), 0.9)).collect();
        let pipeline = make_pipeline(
            VIBE_INTENT,
            Arc::new(StaticEmbedder {
                vector: vec![1.0, 0.0],
            }),
            rows,
        );

        let response = pipeline.search("伤感的歌", 3).await.unwrap();
        assert_eq!(response.results.len(), 3);
    }
}
