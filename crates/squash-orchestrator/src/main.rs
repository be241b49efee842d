//! Orchestrator binary.
//!
//! Connects to the Docker daemon, pulls the worker image and then waits
//! for shutdown. Job intake arrives through the message-queue
//! collaborator, which is wired by the deployment, not here.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use squash_runtime::{ContainerRuntime, RuntimeConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("squash=info".parse().unwrap())
        .add_directive("bollard=warn".parse().unwrap());

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
                    .with_line_number(false)
            )
            .with(env_filter)
            .init();
    }

    info!("Starting squash-orchestrator");

    // Load configuration
    let config = RuntimeConfig::from_env();
    info!("Worker image: {}", config.worker_image);

    // Connect to Docker and pull the worker image
    let runtime = match ContainerRuntime::connect(config) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to connect to Docker: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.initialize().await {
        error!("Failed to initialize container runtime: {}", e);
        std::process::exit(1);
    }

    info!("Container runtime ready, waiting for jobs");

    // Wait for shutdown signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    let active = runtime.active_containers().await;
    if !active.is_empty() {
        info!("Shutting down with {} active containers", active.len());
    }

    info!("Orchestrator stopped");
}
