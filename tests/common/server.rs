//! Test server lifecycle management.
//!
//! Each test gets an isolated app on a random port with its own in-memory
//! session store and a canned LLM provider, so no test talks to a real
//! model service.

use async_trait::async_trait;
use erascope::naming::llm::{CompletionOptions, LlmError, LlmProvider};
use erascope::naming::{EraNamer, NamerConfig};
use erascope::segmenter::SegmenterConfig;
use erascope::session::SessionStore;
use erascope::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use std::sync::Arc;
use std::time::Duration;

pub const CANNED_TITLE: &str = "Neon Winter";
pub const CANNED_SUMMARY: &str =
    "Late nights on repeat with a tight set of favorites carrying the season.";

/// Provider returning a fixed completion; no network involved.
pub struct CannedProvider {
    content: String,
}

#[async_trait]
impl LlmProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-1"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        Ok(self.content.clone())
    }
}

/// Thresholds loose enough that single-week fixtures survive filtering.
pub fn loose_segmenter() -> SegmenterConfig {
    SegmenterConfig {
        min_weeks: 1,
        min_era_ms: 0,
        ..Default::default()
    }
}

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345").
    pub base_url: String,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawn with the canned provider and loose segmentation thresholds.
    pub async fn spawn() -> Self {
        let provider: Arc<dyn LlmProvider> = Arc::new(CannedProvider {
            content: format!(
                r#"{{"title": "{}", "summary": "{}"}}"#,
                CANNED_TITLE, CANNED_SUMMARY
            ),
        });
        Self::spawn_with(Some(provider), loose_segmenter()).await
    }

    pub async fn spawn_with(
        provider: Option<Arc<dyn LlmProvider>>,
        segmenter: SegmenterConfig,
    ) -> Self {
        let state = ServerState {
            store: Arc::new(SessionStore::new(Duration::from_secs(3600))),
            namer: Arc::new(EraNamer::new(provider, NamerConfig::default())),
            segmenter,
            config: ServerConfig {
                port: 0,
                requests_logging_level: RequestsLoggingLevel::None,
                allowed_origins: vec!["*".to_string()],
            },
        };
        let app = make_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .expect("Failed to build reqwest client");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    assert!(
                        tokio::time::Instant::now() < deadline,
                        "server did not become ready"
                    );
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
