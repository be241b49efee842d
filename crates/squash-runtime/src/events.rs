//! Container event stream.
//!
//! The worker writes fixed sentinel lines to its stdout; this module
//! classifies each line of the container's combined output into a typed
//! [`ContainerEvent`]. The probe payload is the one multi-line case: the
//! lines between `START_PROBE_DATA` and `END_PROBE_DATA` are buffered and
//! parsed as a single JSON document.

use squash_models::{protocol, ProbeResult};

/// A typed event read from a worker container's output.
///
/// Ordering of events equals the byte order of the underlying stream;
/// there is a single producer (the reader task) and a single consumer
/// (the orchestrator) per container.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerEvent {
    /// Worker HTTP server is up and accepting commands
    ApplicationStarted,
    /// Worker HTTP server failed
    ServerFailed,
    /// Source fetch failed or size validation did not pass
    DownloadFailed,
    /// Source fetch finished and validated
    DownloadCompleted,
    /// Probe process failed
    ProbeFailed,
    /// Parsed probe payload
    ProbeData(ProbeResult),
    /// Transcode process spawned
    CompressionStarted,
    /// Transcode failed or produced no output
    CompressionFailed,
    /// Transcode finished and the output file exists
    CompressionCompleted,
    /// A line matching no sentinel; forwarded for its diagnostic value
    Unrecognized(String),
    /// Clean end of the container's output stream
    Eof,
    /// Protocol-level error (e.g. unparsable probe payload); the stream
    /// itself is still readable
    Error(String),
}

/// Stateful line classifier for the sentinel protocol.
///
/// Pure: no I/O, one event at most per fed line, so it can be tested
/// without a container. Lines inside a probe block produce no event
/// until the end-marker closes the block.
#[derive(Debug, Default)]
pub struct SentinelParser {
    collecting: bool,
    buffer: String,
}

impl SentinelParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one line of container output.
    pub fn feed(&mut self, line: &str) -> Option<ContainerEvent> {
        let line = line.trim();

        match line {
            protocol::APPLICATION_STARTED => Some(ContainerEvent::ApplicationStarted),
            protocol::SERVER_FAILED => Some(ContainerEvent::ServerFailed),
            protocol::DOWNLOAD_FAILED => Some(ContainerEvent::DownloadFailed),
            protocol::DOWNLOAD_COMPLETED => Some(ContainerEvent::DownloadCompleted),
            protocol::PROBE_FAILED => Some(ContainerEvent::ProbeFailed),
            protocol::START_PROBE_DATA => {
                self.collecting = true;
                self.buffer.clear();
                None
            }
            protocol::END_PROBE_DATA => {
                self.collecting = false;
                match serde_json::from_str::<ProbeResult>(&self.buffer) {
                    Ok(probe) => Some(ContainerEvent::ProbeData(probe)),
                    Err(e) => Some(ContainerEvent::Error(format!(
                        "error parsing probe data: {e}"
                    ))),
                }
            }
            protocol::COMPRESSION_STARTED => Some(ContainerEvent::CompressionStarted),
            protocol::COMPRESSION_FAILED => Some(ContainerEvent::CompressionFailed),
            protocol::COMPRESSION_COMPLETED => Some(ContainerEvent::CompressionCompleted),
            other => {
                if self.collecting {
                    self.buffer.push_str(other);
                    self.buffer.push('\n');
                    None
                } else {
                    Some(ContainerEvent::Unrecognized(other.to_string()))
                }
            }
        }
    }
}
