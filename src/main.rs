use anyhow::Result;
use clap::Parser;
use erascope::config::{allowed_origins_from_env, LlmSettings};
use erascope::naming::llm::CompletionOptions;
use erascope::naming::{EraNamer, NamerConfig};
use erascope::segmenter::SegmenterConfig;
use erascope::session::SessionStore;
use erascope::{run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
struct CliArgs {
    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    logging_level: RequestsLoggingLevel,

    /// Minutes a session may stay idle before the sweeper reclaims it.
    #[clap(long, default_value_t = 60)]
    session_ttl_minutes: u64,

    /// Seconds between sweeper passes.
    #[clap(long, default_value_t = 60)]
    sweep_interval_secs: u64,

    /// Week-to-week similarity below this threshold opens a new era.
    #[clap(long, default_value_t = 0.3)]
    similarity_threshold: f64,

    /// A listening gap longer than this many days always splits eras.
    #[clap(long, default_value_t = 28)]
    max_gap_days: i64,

    /// Eras spanning fewer weeks than this are dropped.
    #[clap(long, default_value_t = 2)]
    min_era_weeks: i64,

    /// Eras with less than this many minutes of listening are dropped.
    #[clap(long, default_value_t = 60)]
    min_era_minutes: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let llm_settings = LlmSettings::from_env()?;
    let provider = llm_settings.build_provider();
    match &provider {
        Some(provider) => info!("LLM naming via {} ({})", provider.name(), provider.model()),
        None => info!("LLM naming disabled, eras get fallback titles"),
    }
    let namer = Arc::new(EraNamer::new(
        provider,
        NamerConfig {
            options: CompletionOptions {
                timeout: llm_settings.timeout,
                ..Default::default()
            },
            ..Default::default()
        },
    ));

    let store = Arc::new(SessionStore::new(Duration::from_secs(
        cli_args.session_ttl_minutes * 60,
    )));
    let shutdown = CancellationToken::new();
    store.spawn_sweeper(
        Duration::from_secs(cli_args.sweep_interval_secs),
        shutdown.clone(),
    );

    let segmenter = SegmenterConfig {
        similarity_threshold: cli_args.similarity_threshold,
        max_gap_days: cli_args.max_gap_days,
        min_weeks: cli_args.min_era_weeks,
        min_era_ms: cli_args.min_era_minutes * 60_000,
    };

    let state = ServerState {
        store,
        namer,
        segmenter,
        config: ServerConfig {
            port: cli_args.port,
            requests_logging_level: cli_args.logging_level,
            allowed_origins: allowed_origins_from_env(),
        },
    };

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        }
    });

    info!("Ready to serve at port {}!", cli_args.port);
    run_server(state, shutdown).await
}
