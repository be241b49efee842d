//! CLI process wrappers for the transcode worker.
//!
//! Everything here shells out: ffprobe for inspection, ffmpeg for the
//! transcode, curl for the source fetch. Processes that outlive the HTTP
//! request (fetch, transcode) are spawned and handed back as children so
//! the caller can watch them and report completion over the sentinel
//! protocol.

pub mod command;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod probe;

pub use command::{check_curl, check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use fetch::{content_length, spawn_fetch, verify_fetched};
pub use filters::scale_pad_filter;
pub use probe::run_ffprobe;
