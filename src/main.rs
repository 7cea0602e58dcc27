use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
use config::{AppConfig, CliConfig, FileConfig};

mod embedding;
use embedding::{Embedder, HttpEmbedder};

mod llm;
use llm::{LlmProvider, OpenAiProvider};

mod search;
use search::{IntentClassifier, QueryPipeline, RecommendationScorer, SignalFusionRanker};

mod server;
use server::{run_server, ServerState};

mod song_store;
use song_store::{SongStore, SqliteSongStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite song database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML configuration file.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the OpenAI-compatible intent classification service.
    #[clap(long, default_value = "https://api.longcat.chat/openai/v1")]
    pub llm_url: String,

    /// Chat model used for intent classification.
    #[clap(long, default_value = "LongCat-Flash-Chat")]
    pub llm_model: String,

    /// Base URL of the OpenAI-compatible embedding service.
    #[clap(long, default_value = "https://api.siliconflow.cn/v1")]
    pub embedding_url: String,

    /// Embedding model for query vectors.
    #[clap(long, default_value = "BAAI/bge-m3")]
    pub embedding_model: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;

    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        frontend_dir_path: cli_args.frontend_dir_path,
        llm_url: cli_args.llm_url,
        llm_model: cli_args.llm_model,
        embedding_url: cli_args.embedding_url,
        embedding_model: cli_args.embedding_model,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite song database at {:?}...", config.songs_db_path());
    let song_store: Arc<dyn SongStore> = Arc::new(SqliteSongStore::new(
        &config.songs_db_path(),
        config.lexical_bonuses,
    )?);
    info!("Song catalog holds {} songs", song_store.count_songs()?);

    let provider = Arc::new(OpenAiProvider::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.api_key.clone(),
    ));
    match provider.health_check().await {
        Ok(()) => info!(
            provider = provider.name(),
            model = provider.model(),
            url = %config.llm.base_url,
            "Intent service reachable"
        ),
        // Non-fatal: classification degrades per query, so the server
        // still comes up when the intent service is down.
        Err(e) => warn!(
            provider = provider.name(),
            model = provider.model(),
            url = %config.llm.base_url,
            error = %e,
            "Intent service unreachable, queries will degrade to vibe search"
        ),
    }

    let embedder = Arc::new(HttpEmbedder::new(
        config.embedding.base_url.clone(),
        config.embedding.model.clone(),
        config.embedding.api_key.clone(),
    ));
    info!(
        "Query embeddings via {} at {} ({} dims)",
        config.embedding.model,
        config.embedding.base_url,
        embedder.dimension()
    );

    let pipeline = Arc::new(QueryPipeline::new(
        IntentClassifier::new(provider),
        embedder,
        song_store.clone(),
        SignalFusionRanker::new(config.fusion),
    ));
    let scorer = Arc::new(RecommendationScorer::new(config.recommend));

    let state = ServerState::new(pipeline, scorer, song_store);

    info!("Ready to serve at port {}!", config.port);
    run_server(state, config.port, config.frontend_dir_path.clone()).await
}
