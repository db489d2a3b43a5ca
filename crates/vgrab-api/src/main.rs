//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vgrab_api::services::download::scratch_root;
use vgrab_api::{create_router, metrics, ApiConfig, AppState, SessionSweeper};
use vgrab_media::{check_ffmpeg, check_ytdlp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vgrab_api=info,vgrab_media=info,tower_http=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vgrab-api");

    // Load configuration
    let config = ApiConfig::from_env();
    info!(
        "API config: host={}, port={}, environment={}, scratch={}",
        config.host,
        config.port,
        config.environment,
        scratch_root(config.scratch_dir.as_deref()).display()
    );

    // The server still starts without the tools; /ready reports them
    match check_ytdlp(&config.ytdlp_path) {
        Ok(path) => info!("Using yt-dlp at {}", path.display()),
        Err(e) => warn!("{}", e),
    }
    if let Err(e) = check_ffmpeg() {
        warn!("{} (merging, clipping and MP3 extraction will fail)", e);
    }

    let state = AppState::new(config.clone());

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("Failed to install Prometheus recorder")?)
    } else {
        None
    };

    // Start expired session sweeper
    let sweeper = SessionSweeper::new(state.sessions.clone());
    tokio::spawn(async move {
        sweeper.run().await;
    });

    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
