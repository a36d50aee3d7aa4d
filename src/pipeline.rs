//! Per-session processing pipeline: stats, segmentation, naming, playlists.
//!
//! One pipeline task runs per session, so its stages execute sequentially;
//! distinct sessions process in parallel. Every stage transition goes through
//! the store, which enforces monotone progress.

use crate::naming::EraNamer;
use crate::playlist;
use crate::segmenter::{self, SegmenterConfig};
use crate::session::{SessionStore, Stage};
use crate::stats;
use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Drive one session through the whole pipeline. Any failure moves the
/// session to the terminal error stage carrying the failure message.
pub async fn run(
    store: Arc<SessionStore>,
    namer: Arc<EraNamer>,
    config: SegmenterConfig,
    session_id: String,
) {
    if let Err(err) = execute(&store, &namer, &config, &session_id).await {
        warn!(session = %session_id, "Processing failed: {}", err);
        store.fail(&session_id, err.to_string());
    }
}

async fn execute(
    store: &Arc<SessionStore>,
    namer: &Arc<EraNamer>,
    config: &SegmenterConfig,
    session_id: &str,
) -> Result<()> {
    let events = store
        .take_events(session_id)
        .ok_or_else(|| anyhow!("Session has no parsed events"))?;

    let stats = stats::compute_stats(&events);

    // Segmentation is CPU bound; the events are dropped with the closure,
    // reclaiming the largest per-session buffer.
    let segmenter_config = config.clone();
    let mut eras =
        tokio::task::spawn_blocking(move || segmenter::segment_events(&events, &segmenter_config))
            .await
            .map_err(|err| anyhow!("Segmentation task failed: {}", err))?;

    if eras.is_empty() {
        bail!("No distinct eras found");
    }
    info!(session = %session_id, eras = eras.len(), "Segmentation complete");

    store.set_stats(session_id, stats);
    store.set_eras(session_id, eras.clone());
    store.update_progress(session_id, Stage::Segmented, 40, None);

    namer
        .name_all_eras(&mut eras, |percent| {
            store.update_progress(session_id, Stage::Naming, percent, None);
        })
        .await;
    store.update_progress(session_id, Stage::Named, 70, None);

    store.update_progress(session_id, Stage::Playlists, 80, None);
    let playlists = playlist::build_playlists(&eras);
    store.set_eras(session_id, eras);
    store.set_playlists(session_id, playlists);
    store.update_progress(session_id, Stage::Complete, 100, None);

    Ok(())
}
