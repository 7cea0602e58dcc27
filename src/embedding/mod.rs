//! Embedding service client.
//!
//! Texts are embedded remotely (BAAI/bge-m3 behind an OpenAI-compatible
//! `/embeddings` endpoint). The search core consumes the service through
//! the [`Embedder`] trait so tests can run without the network.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Dimension of the embedding vectors (bge-m3).
pub const EMBEDDING_DIM: usize = 1024;

/// Inputs are truncated to this many characters before embedding; the
/// model's quality degrades beyond it and the service rejects very long
/// inputs outright.
pub const MAX_INPUT_CHARS: usize = 1500;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from the embedding service.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for text embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a text into a fixed-length vector. Implementations truncate
    /// the input to [`MAX_INPUT_CHARS`] characters.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// The dimension of the vectors this embedder produces.
    fn dimension(&self) -> usize;
}

/// Embedder backed by an OpenAI-compatible `/embeddings` HTTP endpoint.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    /// # Arguments
    /// * `base_url` - Base URL of the API (e.g., "https://api.siliconflow.cn/v1").
    /// * `model` - Embedding model name (e.g., "BAAI/bge-m3").
    /// * `api_key` - Optional bearer token.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let truncated: String = text.chars().take(MAX_INPUT_CHARS).collect();

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: truncated,
            encoding_format: "float",
        };

        debug!(model = %self.model, input_chars = request.input.chars().count(), "Embedding text");

        let url = format!("{}/embeddings", self.base_url);
        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbedError::Timeout
                } else {
                    EmbedError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::InvalidResponse("No embedding in response".to_string()))?;

        if vector.len() != EMBEDDING_DIM {
            return Err(EmbedError::InvalidResponse(format!(
                "Expected {} dimensions, got {}",
                EMBEDDING_DIM,
                vector.len()
            )));
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_matches_model() {
        let embedder = HttpEmbedder::new("http://localhost/v1", "BAAI/bge-m3", None);
        assert_eq!(embedder.dimension(), EMBEDDING_DIM);
    }

    #[test]
    fn test_request_serialization() {
        let request = EmbeddingRequest {
            model: "BAAI/bge-m3".to_string(),
            input: "晴天".to_string(),
            encoding_format: "float",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "BAAI/bge-m3");
        assert_eq!(json["encoding_format"], "float");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // Multi-byte characters must not be split.
        let long: String = "雨".repeat(MAX_INPUT_CHARS + 100);
        let truncated: String = long.chars().take(MAX_INPUT_CHARS).collect();
        assert_eq!(truncated.chars().count(), MAX_INPUT_CHARS);
    }
}
