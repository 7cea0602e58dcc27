//! Search and recommendation API routes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::search::{ScoredCandidate, SearchResponse, DEFAULT_TOP_K, MAX_TOP_K, MIN_TOP_K};
use crate::song_store::SongSummary;

use super::error::ApiError;
use super::state::ServerState;

#[derive(Deserialize)]
struct SearchParams {
    /// The search query string.
    q: String,
    top_k: Option<usize>,
}

#[derive(Deserialize)]
struct RecommendParams {
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct RecommendResponse {
    /// Display fields of the song the recommendations were derived from,
    /// so clients need not fetch it separately.
    source: SongSummary,
    results: Vec<ScoredCandidate>,
}

async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let top_k = params.top_k.unwrap_or(DEFAULT_TOP_K);
    let response = state.pipeline.search(&params.q, top_k).await?;
    Ok(Json(response))
}

async fn recommend(
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let top_k = params.top_k.unwrap_or(DEFAULT_TOP_K);
    if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        return Err(ApiError::BadRequest(format!(
            "top_k must be between {} and {}",
            MIN_TOP_K, MAX_TOP_K
        )));
    }

    let source = state
        .song_store
        .get_song(&song_id)?
        .ok_or_else(|| ApiError::NotFound(format!("song {} not found", song_id)))?;

    let candidates = state.song_store.recommend_candidates(&song_id)?;
    let results = state.scorer.recommend(&source, &candidates, top_k);

    Ok(Json(RecommendResponse {
        source: SongSummary::from(&source),
        results,
    }))
}

pub fn make_search_routes(state: ServerState) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/recommend/{song_id}", get(recommend))
        .with_state(state)
}
