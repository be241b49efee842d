//! Shared data models for the Squash backend.
//!
//! This crate provides Serde-serializable types for:
//! - Transcode jobs and their pipeline state
//! - The worker command surface (download/compress request bodies)
//! - FFprobe results
//! - The sentinel protocol vocabulary
//! - The JSON response envelope

pub mod command;
pub mod job;
pub mod probe;
pub mod protocol;
pub mod response;

// Re-export common types
pub use command::{CompressRequest, DownloadRequest};
pub use job::{EncodingTarget, Job, JobId, JobState};
pub use probe::{ProbeFormat, ProbeResult, ProbeStream};
pub use response::{Envelope, ErrorBody};
