//! In-memory session store with TTL sweeping.
//!
//! The store owns every session; all other references are by id. Each
//! operation takes the map mutex briefly and refreshes the session's idle
//! timer, so progress reads keep a session alive.

use super::progress::{Progress, Stage};
use crate::models::{AggregateStats, Era, Event, Playlist};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Session not found")]
    NotFound,

    #[error("Session is not awaiting processing (stage: {0})")]
    InvalidStage(Stage),
}

/// Per-upload workspace. Events are moved out by the pipeline after
/// segmentation; results are written back as stages complete.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub events: Option<Vec<Event>>,
    pub stats: Option<AggregateStats>,
    pub eras: Option<Vec<Era>>,
    pub playlists: Option<Vec<Playlist>>,
    pub progress: Progress,
    pub created_at: Instant,
    pub last_accessed_at: Instant,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap()
    }

    fn mutate<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(id)?;
        session.last_accessed_at = Instant::now();
        Some(f(session))
    }

    /// Create a session from freshly parsed events. The upload is already
    /// decoded by the time a session exists, so it starts in `parsed`.
    pub fn create(&self, events: Vec<Event>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Instant::now();
        let session = Session {
            id: id.clone(),
            events: Some(events),
            stats: None,
            eras: None,
            playlists: None,
            progress: Progress::new(Stage::Parsed, 20),
            created_at: now,
            last_accessed_at: now,
        };
        self.lock().insert(id.clone(), session);
        id
    }

    /// Run a closure against a session, refreshing its idle timer.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&Session) -> R) -> Option<R> {
        self.mutate(id, |session| f(session))
    }

    pub fn progress(&self, id: &str) -> Option<Progress> {
        self.mutate(id, |session| session.progress.clone())
    }

    /// Atomically move a parsed session into the segmenting stage, so a
    /// second process trigger cannot race the first.
    pub fn begin_processing(&self, id: &str) -> Result<(), StoreError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(id).ok_or(StoreError::NotFound)?;
        session.last_accessed_at = Instant::now();
        if session.progress.stage != Stage::Parsed {
            return Err(StoreError::InvalidStage(session.progress.stage));
        }
        session.progress = Progress {
            stage: Stage::Segmenting,
            percent: session.progress.percent.max(25),
            message: Some("Detecting eras".to_string()),
        };
        Ok(())
    }

    /// Move the events out of the session so the pipeline owns them.
    pub fn take_events(&self, id: &str) -> Option<Vec<Event>> {
        self.mutate(id, |session| session.events.take()).flatten()
    }

    /// Publish a progress update. Percent is clamped to be monotonically
    /// non-decreasing; terminal stages are never overwritten.
    pub fn update_progress(&self, id: &str, stage: Stage, percent: u8, message: Option<String>) {
        self.mutate(id, |session| {
            if session.progress.stage.is_terminal() {
                return;
            }
            let percent = percent.max(session.progress.percent);
            session.progress = Progress {
                stage,
                percent,
                message,
            };
        });
    }

    /// Transition a session to the terminal error stage, keeping the percent
    /// it reached.
    pub fn fail(&self, id: &str, message: impl Into<String>) {
        let message = message.into();
        self.mutate(id, |session| {
            if session.progress.stage.is_terminal() {
                return;
            }
            session.progress = Progress {
                stage: Stage::Error,
                percent: session.progress.percent,
                message: Some(message),
            };
        });
    }

    pub fn set_stats(&self, id: &str, stats: AggregateStats) {
        self.mutate(id, |session| session.stats = Some(stats));
    }

    pub fn set_eras(&self, id: &str, eras: Vec<Era>) {
        self.mutate(id, |session| session.eras = Some(eras));
    }

    pub fn set_playlists(&self, id: &str, playlists: Vec<Playlist>) {
        self.mutate(id, |session| session.playlists = Some(playlists));
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were
    /// removed.
    pub fn sweep_expired(&self) -> usize {
        let mut sessions = self.lock();
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = now.duration_since(session.last_accessed_at) <= self.ttl;
            if !keep {
                debug!(
                    session = %id,
                    age = ?now.duration_since(session.created_at),
                    "Sweeping idle session"
                );
            }
            keep
        });
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Periodic background sweep, stopped through the cancellation token.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep_expired();
                        if removed > 0 {
                            info!(removed, "Swept idle sessions");
                        }
                    }
                    _ = shutdown.cancelled() => break,
                }
            }
        })
    }
}
