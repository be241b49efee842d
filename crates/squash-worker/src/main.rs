//! Transcode worker binary.
//!
//! Stdout is reserved for the control protocol, so all diagnostics are
//! written to stderr. APPLICATION_STARTED is only announced after the
//! listener is bound; if the server cannot come up, SERVER_FAILED is the
//! last line on stdout.

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use squash_media::{check_curl, check_ffmpeg, check_ffprobe};
use squash_models::protocol;
use squash_worker::{create_router, sentinel, AppState, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing with colored output for dev, JSON for production.
    // Everything goes to stderr; stdout carries the sentinel protocol.
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("squash=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
            )
            .with(env_filter)
            .init();
    }

    info!("Starting squash-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Preflight the external binaries; commands will fail later anyway,
    // but a missing tool is worth knowing at boot
    for check in [check_ffmpeg(), check_ffprobe(), check_curl()] {
        if let Err(e) = check {
            warn!("{}", e);
        }
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.work_dir).await {
        error!("Failed to create work dir {}: {}", config.work_dir.display(), e);
        sentinel::emit(protocol::SERVER_FAILED);
        std::process::exit(1);
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config);
    let router = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            sentinel::emit(protocol::SERVER_FAILED);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);
    sentinel::emit(protocol::APPLICATION_STARTED);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        sentinel::emit(protocol::SERVER_FAILED);
        std::process::exit(1);
    }
}
