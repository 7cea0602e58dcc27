//! LLM-backed query intent classification.
//!
//! A raw query like "想听周杰伦的晴天" is turned into a structured intent:
//! optional artist, optional title, a purified vibe phrase, and a
//! category routing the fusion weights. Classification is best-effort by
//! contract: any provider failure or schema violation collapses into the
//! degraded all-vibe intent, never an error.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::llm::{CompletionOptions, LlmProvider, Message};

use super::types::{Intent, IntentCategory};

const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_PROMPT: &str = "You are a music search intent parser. \
Decompose the user's query into a JSON object with exactly these fields:\n\
- \"artist\": the artist name if one is mentioned, else null\n\
- \"title\": the song title if one is mentioned, else null\n\
- \"vibe\": the pure mood/scene/lyric description, translated to Simplified Chinese\n\
- \"type\": \"exact\" if an artist or title was found, \"lyrics\" if the query \
looks like a lyric fragment, \"vibe\" otherwise\n\
Output only the JSON object.";

/// The classifier's raw output, validated at the boundary.
///
/// The service returns free-form JSON; everything is optional here and
/// normalized into a well-formed [`Intent`] afterwards, so a partially
/// conforming response still produces something usable.
#[derive(Debug, Deserialize)]
struct RawIntent {
    artist: Option<String>,
    title: Option<String>,
    vibe: Option<String>,
    #[serde(rename = "type")]
    category: Option<String>,
}

/// Classifies raw queries into structured intents via an LLM.
pub struct IntentClassifier {
    provider: Arc<dyn LlmProvider>,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Classify a query. Never fails: on any provider or parse error the
    /// degraded Vibe intent (vibe = raw query) is returned and the
    /// failure is logged.
    pub async fn classify(&self, query: &str) -> Intent {
        let options = CompletionOptions {
            temperature: 0.0,
            timeout: CLASSIFY_TIMEOUT,
            json_mode: true,
            ..CompletionOptions::default()
        };
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(query)];

        let response = match self.provider.complete(&messages, &options).await {
            Ok(response) => response,
            Err(e) => {
                warn!(query = %query, error = %e, "Intent service failed, degrading to vibe search");
                return Intent::degraded(query);
            }
        };

        match serde_json::from_str::<RawIntent>(&response.content) {
            Ok(raw) => {
                let intent = Self::normalize(raw, query);
                debug!(
                    query = %query,
                    category = intent.category.as_str(),
                    artist = ?intent.artist,
                    title = ?intent.title,
                    "Query intent classified"
                );
                intent
            }
            Err(e) => {
                warn!(
                    query = %query,
                    error = %e,
                    "Unparseable intent response, degrading to vibe search"
                );
                Intent::degraded(query)
            }
        }
    }

    /// Collapse the service's loose output into a well-formed intent.
    /// Empty strings count as absent; an empty vibe falls back to the raw
    /// query so downstream embedding always has a target.
    fn normalize(raw: RawIntent, query: &str) -> Intent {
        let non_empty = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let vibe = non_empty(raw.vibe).unwrap_or_else(|| query.to_string());
        let category = raw
            .category
            .as_deref()
            .map(IntentCategory::parse_or_vibe)
            .unwrap_or(IntentCategory::Vibe);

        Intent {
            artist: non_empty(raw.artist),
            title: non_empty(raw.title),
            vibe,
            category,
        }
    }
}
