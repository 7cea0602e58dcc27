use anyhow::{Context, Result};
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::song_store::{Song, SongSummary};

use super::error::ApiError;
use super::make_search_routes;
use super::state::*;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub songs: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> Result<Json<ServerStats>, ApiError> {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        songs: state.song_store.count_songs()?,
    };
    Ok(Json(stats))
}

/// Song representation for the detail endpoint. Embedding vectors and
/// TF-IDF terms are internal and never serialized to clients.
#[derive(Serialize)]
struct SongDetail {
    id: String,
    title: String,
    artist: String,
    album_cover: Option<String>,
    lyrics: Option<String>,
    review_text: Option<String>,
    vibe_tags: Option<Vec<String>>,
    recommend_scene: Option<String>,
    core_lyrics: Option<String>,
}

impl From<Song> for SongDetail {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            title: song.title,
            artist: song.artist,
            album_cover: song.album_cover,
            lyrics: song.lyrics,
            review_text: song.review_text,
            vibe_tags: song.vibe_tags,
            recommend_scene: song.recommend_scene,
            core_lyrics: song.core_lyrics,
        }
    }
}

async fn get_song(
    State(song_store): State<GuardedSongStore>,
    Path(id): Path<String>,
) -> Result<Json<SongDetail>, ApiError> {
    match song_store.get_song(&id)? {
        Some(song) => Ok(Json(SongDetail::from(song))),
        None => Err(ApiError::NotFound(format!("song {} not found", id))),
    }
}

const MAX_RANDOM_SONGS: usize = 50;

#[derive(Deserialize)]
struct RandomSongsParams {
    count: Option<usize>,
}

async fn get_random_songs(
    State(song_store): State<GuardedSongStore>,
    Query(params): Query<RandomSongsParams>,
) -> Result<Json<Vec<SongSummary>>, ApiError> {
    let count = params.count.unwrap_or(10).min(MAX_RANDOM_SONGS);
    let songs = song_store.random_songs(count)?;
    Ok(Json(songs.iter().map(SongSummary::from).collect()))
}

pub fn make_app(state: ServerState, frontend_dir_path: Option<String>) -> Router {
    let api_routes: Router = Router::new()
        .route("/songs/{id}", get(get_song))
        .route("/songs/random/list", get(get_random_songs))
        .with_state(state.clone())
        .merge(make_search_routes(state.clone()));

    let home_router: Router = match frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)).with_state(state),
    };

    home_router
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

pub async fn run_server(
    state: ServerState,
    port: u16,
    frontend_dir_path: Option<String>,
) -> Result<()> {
    let app = make_app(state, frontend_dir_path);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    Ok(axum::serve(listener, app).await?)
}
