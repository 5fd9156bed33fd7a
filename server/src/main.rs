//! Coupang HTML Capture Server – ingests web-page snapshots over HTTP,
//! decodes and analyzes the HTML, and persists structured records.
//!
//! This binary:
//! 1. Reads configuration from `pagecap.conf` (or argv[1])
//! 2. Bootstraps the data directory
//! 3. Runs the axum HTTP server until shutdown

mod analyze;
mod decode;
mod error;
mod format;
mod routes;
mod store;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── load config ──────────────────────────────────────────────────
    let explicit_path = std::env::args().nth(1);
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| pagecap_common::config::Config::default_path().to_string());
    let config = pagecap_common::config::load_or_default(
        &PathBuf::from(&config_path),
        explicit_path.is_some(),
    )
    .context("Config load failed")?;

    info!(
        "Coupang HTML Capture Server starting (listen={})",
        config.listen_addr
    );

    // Ensure the data directory exists
    std::fs::create_dir_all(&config.data_dir).context("Cannot create data directory")?;
    info!("Data directory: {}", config.data_dir.display());

    // ── ctrl-c ───────────────────────────────────────────────────────
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::Relaxed);
        info!("Shutdown signal received");
    })
    .context("Cannot set Ctrl-C handler")?;

    // ── start HTTP server ────────────────────────────────────────────
    let state = routes::AppState::new(config.data_dir.clone());
    let app = routes::router(state, config.max_body_bytes());

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Cannot bind {}", config.listen_addr))?;

    info!("Endpoints:");
    info!("  POST /post_coupang    - store an HTML capture");
    info!("  GET  /list            - list stored captures");
    info!("  GET  /view/{{filename}} - view one stored capture");
    info!("  GET  /health          - server status");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                if SHUTDOWN.load(Ordering::Relaxed) {
                    break;
                }
            }
        })
        .await?;

    info!("Coupang HTML Capture Server stopped");
    Ok(())
}
