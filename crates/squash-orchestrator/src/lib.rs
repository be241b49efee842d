//! Per-job transcode pipeline.
//!
//! Drives one job from `Created` to `Completed` or `Failed`: request a
//! worker container, read its sentinel event stream, issue the next
//! command only once the event confirming readiness for it was
//! observed, and tear the container down exactly once on the terminal
//! transition.

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;

pub use client::{HttpWorkerConnector, WorkerClient, WorkerCommands, WorkerConnector};
pub use config::OrchestratorConfig;
pub use error::{CommandError, OrchestratorError, OrchestratorResult};
pub use pipeline::Orchestrator;
pub use store::{JobStore, ResultSink, StoreError};
