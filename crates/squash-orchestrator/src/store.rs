//! Collaborator contracts.
//!
//! Job persistence and the handoff of finished outputs live with other
//! services; the orchestrator only depends on these narrow traits.

use async_trait::async_trait;
use thiserror::Error;

use squash_models::{Job, JobId};

/// Collaborator-side failure, carried as an opaque message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Job persistence contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_job(&self, id: JobId) -> Result<Job, StoreError>;
    async fn update_job(&self, job: &Job) -> Result<(), StoreError>;
}

/// Handoff of a completed job's output (pre-signed upload URLs and
/// whatever follows live behind this seam).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn publish(&self, job: &Job) -> Result<(), StoreError>;
}
