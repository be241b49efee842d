//! Shared worker state.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::WorkerConfig;

/// The downloaded source file, recorded by `/download` and consumed by
/// `/probe` and `/compress`.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub path: PathBuf,
    pub container: String,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: WorkerConfig,
    pub input: Arc<Mutex<Option<InputFile>>>,
}

impl AppState {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            input: Arc::new(Mutex::new(None)),
        }
    }

    /// Path the source for `container` is downloaded to.
    pub fn input_path(&self, container: &str) -> PathBuf {
        self.config.work_dir.join(format!("input.{container}"))
    }

    /// Path the transcode writes its output to.
    pub fn output_path(&self, container: &str) -> PathBuf {
        self.config.work_dir.join(format!("output.{container}"))
    }
}
