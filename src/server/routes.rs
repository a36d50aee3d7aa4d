//! HTTP surface: upload, process trigger, progress stream, read endpoints.

use super::error::ApiError;
use super::requests_logging::log_requests;
use super::sse::progress_stream;
use super::state::ServerState;
use crate::models::{ArtistPlays, DateRange, Playlist, TrackPlays};
use crate::parser::{self, UploadKind};
use crate::pipeline;
use crate::session::{Progress, Stage, StoreError};
use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info};

/// Uploads above this size are rejected outright.
const MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

// =============================================================================
// Response Types
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct UploadResponse {
    session_id: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct SummaryResponse {
    total_eras: usize,
    date_range: Option<DateRange>,
    total_listening_time_ms: u64,
    total_tracks: usize,
    total_artists: usize,
}

#[derive(Serialize)]
struct EraSummary {
    id: u32,
    title: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    top_artists: Vec<ArtistPlays>,
    playlist_track_count: usize,
}

#[derive(Serialize)]
struct EraDetail {
    id: u32,
    title: String,
    summary: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_ms_played: u64,
    top_artists: Vec<ArtistPlays>,
    top_tracks: Vec<TrackPlays>,
    playlist: Option<Playlist>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// POST /upload - decode a streaming history file into a new session.
///
/// Parse failures surface synchronously as 400 responses; a successful
/// upload leaves the session in the `parsed` stage awaiting a process
/// trigger.
async fn upload(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut filename: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart request: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(|name| name.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?;
            data = Some(bytes.to_vec());
        }
    }

    let data = match data {
        Some(data) if !data.is_empty() => data,
        _ => return Err(ApiError::Validation("Missing upload field 'file'".to_string())),
    };

    let kind = UploadKind::detect(&data, filename.as_deref()).ok_or_else(|| {
        ApiError::Validation("Unrecognized file type, expected .json or .zip".to_string())
    })?;

    debug!(?kind, bytes = data.len(), "Decoding upload");

    // Parsing is CPU bound; keep it off the reactor threads.
    let events = tokio::task::spawn_blocking(move || parser::parse_upload(&data, kind))
        .await
        .map_err(|e| ApiError::Internal(format!("Parse task failed: {}", e)))?
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let session_id = state.store.create(events);
    info!(session = %session_id, "Upload parsed");
    Ok(Json(UploadResponse { session_id }))
}

/// POST /process/{session_id} - fire the pipeline and return immediately.
/// Progress is observed through the SSE stream, not this response.
async fn process(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.begin_processing(&session_id).map_err(|err| match err {
        StoreError::NotFound => ApiError::session_not_found(&session_id),
        StoreError::InvalidStage(stage) => ApiError::Validation(format!(
            "Session is not awaiting processing (stage: {})",
            stage
        )),
    })?;

    tokio::spawn(pipeline::run(
        state.store.clone(),
        state.namer.clone(),
        state.segmenter.clone(),
        session_id,
    ));

    Ok(Json(StatusResponse { status: "ok" }))
}

/// Reads are gated on the terminal stages: 425 while processing, the error
/// message once the pipeline has failed.
fn ensure_complete(progress: &Progress) -> Result<(), ApiError> {
    match progress.stage {
        Stage::Complete => Ok(()),
        Stage::Error => Err(ApiError::Failed(
            progress
                .message
                .clone()
                .unwrap_or_else(|| "Processing failed".to_string()),
        )),
        stage => Err(ApiError::NotReady(stage)),
    }
}

async fn session_summary(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let (progress, stats, total_eras) = state
        .store
        .with_session(&session_id, |session| {
            (
                session.progress.clone(),
                session.stats.clone(),
                session.eras.as_ref().map(Vec::len).unwrap_or(0),
            )
        })
        .ok_or_else(|| ApiError::session_not_found(&session_id))?;
    ensure_complete(&progress)?;

    let stats =
        stats.ok_or_else(|| ApiError::Internal("Completed session has no stats".to_string()))?;

    Ok(Json(SummaryResponse {
        total_eras,
        date_range: stats.date_range,
        total_listening_time_ms: stats.total_ms,
        total_tracks: stats.total_tracks,
        total_artists: stats.total_artists,
    }))
}

async fn list_eras(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<EraSummary>>, ApiError> {
    let (progress, eras, playlists) = state
        .store
        .with_session(&session_id, |session| {
            (
                session.progress.clone(),
                session.eras.clone(),
                session.playlists.clone(),
            )
        })
        .ok_or_else(|| ApiError::session_not_found(&session_id))?;
    ensure_complete(&progress)?;

    let playlists = playlists.unwrap_or_default();
    let summaries = eras
        .unwrap_or_default()
        .into_iter()
        .map(|era| {
            let playlist_track_count = playlists
                .iter()
                .find(|playlist| playlist.era_id == era.id)
                .map(|playlist| playlist.tracks.len())
                .unwrap_or(0);
            EraSummary {
                id: era.id,
                title: era.title,
                start_date: era.start_date,
                end_date: era.end_date,
                top_artists: era.top_artists.into_iter().take(3).collect(),
                playlist_track_count,
            }
        })
        .collect();

    Ok(Json(summaries))
}

async fn era_detail(
    State(state): State<ServerState>,
    Path((session_id, era_id)): Path<(String, String)>,
) -> Result<Json<EraDetail>, ApiError> {
    let era_id: u32 = era_id
        .parse()
        .map_err(|_| ApiError::Validation("Era id must be an integer".to_string()))?;

    let (progress, eras, playlists) = state
        .store
        .with_session(&session_id, |session| {
            (
                session.progress.clone(),
                session.eras.clone(),
                session.playlists.clone(),
            )
        })
        .ok_or_else(|| ApiError::session_not_found(&session_id))?;
    ensure_complete(&progress)?;

    let era = eras
        .unwrap_or_default()
        .into_iter()
        .find(|era| era.id == era_id)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown era: {}", era_id)))?;
    let playlist = playlists
        .unwrap_or_default()
        .into_iter()
        .find(|playlist| playlist.era_id == era_id);

    Ok(Json(EraDetail {
        id: era.id,
        title: era.title,
        summary: era.summary,
        start_date: era.start_date,
        end_date: era.end_date,
        total_ms_played: era.total_ms_played,
        top_artists: era.top_artists,
        top_tracks: era.top_tracks,
        playlist,
    }))
}

// =============================================================================
// Router Construction
// =============================================================================

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn make_app(state: ServerState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/process/{session_id}", post(process))
        .route("/progress/{session_id}", get(progress_stream))
        .route("/session/{session_id}/summary", get(session_summary))
        .route("/session/{session_id}/eras", get(list_eras))
        .route("/session/{session_id}/eras/{era_id}", get(era_detail))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

pub async fn run_server(state: ServerState, shutdown: CancellationToken) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on 127.0.0.1:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
