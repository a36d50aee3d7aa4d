//! Erascope Server Library
//!
//! Turns an uploaded extended streaming history into a timeline of listening
//! eras: weekly aggregation, similarity-based segmentation, LLM naming with
//! deterministic fallbacks, and derived playlists, served over a small HTTP
//! API with server-push progress.

pub mod config;
pub mod models;
pub mod naming;
pub mod parser;
pub mod pipeline;
pub mod playlist;
pub mod segmenter;
pub mod server;
pub mod session;
pub mod stats;

// Re-export commonly used types for convenience
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
pub use session::SessionStore;
