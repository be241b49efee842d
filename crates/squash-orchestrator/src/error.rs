//! Orchestrator error types.

use thiserror::Error;

use squash_runtime::RuntimeError;

use crate::store::StoreError;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Failure of an outbound worker command.
///
/// Commands are fire-and-forget; the only thing a command response can
/// tell us is that the worker accepted the work.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("worker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {command}")]
    UnexpectedStatus { command: &'static str, status: u16 },
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("container runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("worker command error: {0}")]
    Command(#[from] CommandError),

    #[error("job store error: {0}")]
    Store(#[from] StoreError),
}
