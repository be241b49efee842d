//! Orchestrator configuration.

use std::time::Duration;

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

/// Orchestrator configuration.
///
/// Each pipeline phase carries its own deadline; a phase that produces
/// no event within its deadline fails the job instead of hanging it
/// forever.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Host the worker control planes are bound on
    pub worker_host: String,
    /// Deadline for APPLICATION_STARTED after container start
    pub boot_deadline: Duration,
    /// Deadline for the download phase
    pub download_deadline: Duration,
    /// Deadline for the probe phase
    pub probe_deadline: Duration,
    /// Deadline for the compress phase
    pub compress_deadline: Duration,
    /// Capacity of the per-job event channel
    pub channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_host: "127.0.0.1".to_string(),
            boot_deadline: Duration::from_secs(30),
            download_deadline: Duration::from_secs(300),
            probe_deadline: Duration::from_secs(60),
            compress_deadline: Duration::from_secs(1800),
            channel_capacity: 64,
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_host: std::env::var("ORCHESTRATOR_WORKER_HOST")
                .unwrap_or(defaults.worker_host),
            boot_deadline: env_secs("BOOT_DEADLINE_SECS", 30),
            download_deadline: env_secs("DOWNLOAD_DEADLINE_SECS", 300),
            probe_deadline: env_secs("PROBE_DEADLINE_SECS", 60),
            compress_deadline: env_secs("COMPRESS_DEADLINE_SECS", 1800),
            channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.channel_capacity),
        }
    }
}
