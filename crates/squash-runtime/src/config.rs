//! Runtime configuration.

use std::time::Duration;

/// Container runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Registry username (required at initialization)
    pub registry_username: Option<String>,
    /// Registry password (required at initialization)
    pub registry_password: Option<String>,
    /// Worker image reference (e.g. "ghcr.io/squashhq/worker:latest")
    pub worker_image: String,
    /// Bound timeout for individual Docker operations
    pub op_timeout: Duration,
    /// First loopback host port assigned to a worker's control plane
    pub port_base: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            registry_username: None,
            registry_password: None,
            worker_image: "squash-worker:latest".to_string(),
            op_timeout: Duration::from_secs(10),
            port_base: 30100,
        }
    }
}

impl RuntimeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            registry_username: std::env::var("DOCKER_USERNAME").ok(),
            registry_password: std::env::var("DOCKER_PASSWORD").ok(),
            worker_image: std::env::var("WORKER_IMAGE_URL")
                .unwrap_or_else(|_| "squash-worker:latest".to_string()),
            op_timeout: Duration::from_secs(
                std::env::var("RUNTIME_OP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            port_base: std::env::var("RUNTIME_PORT_BASE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30100),
        }
    }
}
