//! Sentinel protocol vocabulary.
//!
//! The worker reports progress exclusively by writing fixed lines to its
//! own stdout; the orchestrator's event reader classifies each line of
//! the container's combined output against this closed vocabulary. Both
//! sides share these constants so the emitter and the parser cannot
//! drift.

/// Worker HTTP server is bound and accepting commands.
pub const APPLICATION_STARTED: &str = "APPLICATION_STARTED";
/// Worker HTTP server failed to bind or serve.
pub const SERVER_FAILED: &str = "SERVER_FAILED";

/// Source fetch finished and the file size matched the expected length.
pub const DOWNLOAD_COMPLETED: &str = "DOWNLOAD_COMPLETED";
/// Source fetch failed, or the file size did not match.
pub const DOWNLOAD_FAILED: &str = "DOWNLOAD_FAILED";

/// Probe process failed.
pub const PROBE_FAILED: &str = "PROBE_FAILED";
/// Begin-marker of the probe payload block; the lines between the
/// markers form one JSON document.
pub const START_PROBE_DATA: &str = "START_PROBE_DATA";
/// End-marker of the probe payload block.
pub const END_PROBE_DATA: &str = "END_PROBE_DATA";

/// Transcode process was spawned.
pub const COMPRESSION_STARTED: &str = "COMPRESSION_STARTED";
/// Transcode process exited successfully and the output file exists.
pub const COMPRESSION_COMPLETED: &str = "COMPRESSION_COMPLETED";
/// Transcode process failed or produced no output.
pub const COMPRESSION_FAILED: &str = "COMPRESSION_FAILED";
