//! Server-push progress stream.
//!
//! Polls the session's progress snapshot and emits one SSE data frame per
//! poll, closing after a terminal stage, the hard stream ceiling, or client
//! disconnect. The pipeline never depends on a connected reader.

use super::error::ApiError;
use super::state::ServerState;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Interval between progress snapshots.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Comment keepalive cadence.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Hard ceiling on stream lifetime; the session may keep processing past it.
const STREAM_CEILING: Duration = Duration::from_secs(5 * 60);

pub async fn progress_stream(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.progress(&session_id).is_none() {
        return Err(ApiError::session_not_found(&session_id));
    }
    info!(session = %session_id, "Progress stream opened");

    let store = state.store.clone();
    let stream = async_stream::stream! {
        let deadline = Instant::now() + STREAM_CEILING;
        loop {
            let snapshot = match store.progress(&session_id) {
                Some(snapshot) => snapshot,
                // Swept mid-stream.
                None => break,
            };

            let terminal = snapshot.stage.is_terminal();
            match Event::default().json_data(&snapshot) {
                Ok(event) => yield Ok::<_, std::convert::Infallible>(event),
                Err(err) => {
                    debug!("Failed to encode progress frame: {}", err);
                    break;
                }
            }
            if terminal {
                break;
            }
            if Instant::now() >= deadline {
                debug!(session = %session_id, "Progress stream hit its ceiling");
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(KEEPALIVE_INTERVAL)
                .text("keepalive"),
        ),
    ))
}
