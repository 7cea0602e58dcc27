mod file_config;

pub use file_config::{EmbeddingConfig, FileConfig, LlmConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::search::{FusionConfig, RecommendWeights};
use crate::song_store::LexicalBonuses;

/// Environment variable holding the intent service API key.
pub const INTENT_API_KEY_ENV: &str = "INTENT_API_KEY";
/// Environment variable holding the embedding service API key.
pub const EMBEDDING_API_KEY_ENV: &str = "EMBEDDING_API_KEY";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    pub llm_url: String,
    pub llm_model: String,
    pub embedding_url: String,
    pub embedding_model: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: 3000,
            frontend_dir_path: None,
            llm_url: "https://api.longcat.chat/openai/v1".to_string(),
            llm_model: "LongCat-Flash-Chat".to_string(),
            embedding_url: "https://api.siliconflow.cn/v1".to_string(),
            embedding_model: "BAAI/bge-m3".to_string(),
        }
    }
}

/// Connection settings for one OpenAI-compatible upstream service.
/// API keys come from the environment, never from config files.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub frontend_dir_path: Option<String>,

    // Upstream services
    pub llm: ServiceSettings,
    pub embedding: ServiceSettings,

    // Ranking knobs (with defaults)
    pub fusion: FusionConfig,
    pub lexical_bonuses: LexicalBonuses,
    pub recommend: RecommendWeights,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let llm_file = file.llm.unwrap_or_default();
        let llm = ServiceSettings {
            base_url: llm_file.base_url.unwrap_or_else(|| cli.llm_url.clone()),
            model: llm_file.model.unwrap_or_else(|| cli.llm_model.clone()),
            api_key: std::env::var(INTENT_API_KEY_ENV).ok(),
        };

        let embedding_file = file.embedding.unwrap_or_default();
        let embedding = ServiceSettings {
            base_url: embedding_file
                .base_url
                .unwrap_or_else(|| cli.embedding_url.clone()),
            model: embedding_file
                .model
                .unwrap_or_else(|| cli.embedding_model.clone()),
            api_key: std::env::var(EMBEDDING_API_KEY_ENV).ok(),
        };

        Ok(Self {
            db_dir,
            port,
            frontend_dir_path,
            llm,
            embedding,
            fusion: file.search.unwrap_or_default(),
            lexical_bonuses: file.lexical.unwrap_or_default(),
            recommend: file.recommend.unwrap_or_default(),
        })
    }

    pub fn songs_db_path(&self) -> PathBuf {
        self.db_dir.join("songs.db")
    }
}
