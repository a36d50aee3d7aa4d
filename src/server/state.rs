//! Shared server state and configuration.

use super::requests_logging::RequestsLoggingLevel;
use crate::naming::EraNamer;
use crate::segmenter::SegmenterConfig;
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub requests_logging_level: RequestsLoggingLevel,
    /// CORS origins; a `*` entry allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            requests_logging_level: RequestsLoggingLevel::default(),
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<SessionStore>,
    pub namer: Arc<EraNamer>,
    pub segmenter: SegmenterConfig,
    pub config: ServerConfig,
}
