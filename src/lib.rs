//! VibeCheck Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod embedding;
pub mod llm;
pub mod search;
pub mod server;
pub mod song_store;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use search::{IntentClassifier, QueryPipeline, RecommendationScorer, SignalFusionRanker};
pub use server::{make_app, run_server, ServerState};
pub use song_store::{SongStore, SqliteSongStore};
