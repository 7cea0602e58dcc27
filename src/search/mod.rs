mod fusion;
mod intent;
mod lexical;
mod pipeline;
mod recommend;
mod types;

pub use fusion::{FusionConfig, SignalFusionRanker};
pub use intent::IntentClassifier;
pub use lexical::LexicalAnalyzer;
pub use pipeline::{
    QueryPipeline, SearchResponse, DEFAULT_TOP_K, MAX_QUERY_CHARS, MAX_TOP_K, MIN_TOP_K,
};
pub use recommend::{RecommendWeights, RecommendationScorer};
pub use types::*;
