//! In-container transcode worker.
//!
//! A small HTTP control plane with three command endpoints. Each
//! endpoint starts background work and returns as soon as the work is
//! running; completion is reported exclusively by writing sentinel lines
//! to stdout, which the orchestrator reads from the container's output.
//! Diagnostics go to stderr so they never collide with the protocol.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod sentinel;
pub mod state;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use routes::create_router;
pub use state::AppState;
