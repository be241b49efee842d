//! Error types for the container runtime.

use std::time::Duration;
use thiserror::Error;

use squash_models::JobId;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors from the container lifecycle and event reader.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Missing or rejected registry credentials. The message never
    /// contains credential material.
    #[error("registry authentication failed: {0}")]
    RegistryAuth(String),

    #[error("failed to pull worker image: {0}")]
    ImagePull(String),

    /// Creation gave up after the bounded retries; no container exists.
    #[error("container creation failed after {attempts} attempts: {reason}")]
    ContainerCreation { attempts: u32, reason: String },

    /// A container for this job is already live.
    #[error("job {0} already has an active container")]
    JobAlreadyActive(JobId),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("error reading container output: {0}")]
    Stream(String),

    #[error("docker operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),
}

impl RuntimeError {
    /// True for a Docker "no such container" response.
    pub fn is_not_found(err: &bollard::errors::Error) -> bool {
        matches!(
            err,
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                ..
            }
        )
    }
}
