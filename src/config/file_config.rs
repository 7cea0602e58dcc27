use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::search::{FusionConfig, RecommendWeights};
use crate::song_store::LexicalBonuses;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub frontend_dir_path: Option<String>,

    // Upstream services
    pub llm: Option<LlmConfig>,
    pub embedding: Option<EmbeddingConfig>,

    // Ranking knobs
    pub search: Option<FusionConfig>,
    pub lexical: Option<LexicalBonuses>,
    pub recommend: Option<RecommendWeights>,
}

/// `[llm]` section: the OpenAI-compatible intent classification service.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// `[embedding]` section: the OpenAI-compatible embedding service.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
