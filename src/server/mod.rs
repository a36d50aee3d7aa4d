//! HTTP server: routing, shared state, error mapping and middleware.

pub mod error;
mod requests_logging;
mod routes;
mod sse;
pub mod state;

pub use requests_logging::RequestsLoggingLevel;
pub use routes::{make_app, run_server};
pub use state::{ServerConfig, ServerState};
