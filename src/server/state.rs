use axum::extract::FromRef;

use crate::search::{QueryPipeline, RecommendationScorer};
use crate::song_store::SongStore;
use std::sync::Arc;
use std::time::Instant;

pub type GuardedSongStore = Arc<dyn SongStore>;
pub type GuardedPipeline = Arc<QueryPipeline>;
pub type GuardedScorer = Arc<RecommendationScorer>;

#[derive(Clone)]
pub struct ServerState {
    pub start_time: Instant,
    pub pipeline: GuardedPipeline,
    pub scorer: GuardedScorer,
    pub song_store: GuardedSongStore,
    pub hash: String,
}

impl ServerState {
    pub fn new(
        pipeline: GuardedPipeline,
        scorer: GuardedScorer,
        song_store: GuardedSongStore,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            pipeline,
            scorer,
            song_store,
            hash: env!("GIT_HASH").to_string(),
        }
    }
}

impl FromRef<ServerState> for GuardedSongStore {
    fn from_ref(input: &ServerState) -> Self {
        input.song_store.clone()
    }
}

impl FromRef<ServerState> for GuardedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for GuardedScorer {
    fn from_ref(input: &ServerState) -> Self {
        input.scorer.clone()
    }
}
