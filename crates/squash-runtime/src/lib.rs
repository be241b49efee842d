//! Worker container lifecycle and event stream reader.
//!
//! One ephemeral container per job: this crate pulls the worker image,
//! creates/starts/removes per-job containers against the Docker Engine
//! API, and reads each container's combined output as a line-oriented
//! sentinel stream, turning it into typed [`ContainerEvent`]s.

pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod retry;

pub use config::RuntimeConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use events::{ContainerEvent, SentinelParser};
pub use lifecycle::{ContainerHandle, ContainerLifecycle, ContainerRuntime};
pub use retry::RetryPolicy;
