//! Transcode job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a job, assigned by the database collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline state of a job.
///
/// Transitions are linear: each state is entered at most once, and
/// `Completed`/`Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job accepted, no container requested yet
    #[default]
    Created,
    /// Waiting for a worker container
    ContainerPending,
    /// Container started, waiting for the worker to announce itself
    Booting,
    /// Download command issued
    Downloading,
    /// Probe command issued
    Probing,
    /// Compress command issued
    Compressing,
    /// Output produced and handed off
    Completed,
    /// Terminal failure
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::ContainerPending => "container_pending",
            JobState::Booting => "booting",
            JobState::Downloading => "downloading",
            JobState::Probing => "probing",
            JobState::Compressing => "compressing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Requested output parameters for a transcode.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EncodingTarget {
    /// Video codec (e.g. "libx264", "libx265")
    pub codec: String,
    /// Maximum output width in pixels
    pub max_width: u32,
    /// Maximum output height in pixels
    pub max_height: u32,
    /// Constant Rate Factor (0-51, lower is better quality)
    pub crf: u8,
    /// Encoder preset (e.g. "fast", "medium", "slow")
    pub preset: String,
    /// Audio bitrate in kbit/s
    pub audio_bitrate: u32,
}

impl Default for EncodingTarget {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            max_width: 1920,
            max_height: 1080,
            crf: 23,
            preset: "medium".to_string(),
            audio_bitrate: 128,
        }
    }
}

/// A transcode job, owned by the orchestrator for the lifetime of one
/// attempt. Persisted fields are written back through the database
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Pre-signed URL the worker downloads the source from
    pub source_url: String,

    /// Container format of the uploaded source (e.g. "mp4")
    pub input_container: String,

    /// Container format of the output
    pub output_container: String,

    /// Requested output parameters
    pub target: EncodingTarget,

    /// Pipeline state
    #[serde(default)]
    pub state: JobState,

    /// Container-creation attempts consumed so far
    #[serde(default)]
    pub create_attempts: u32,

    /// Whether the source file finished uploading to object storage
    #[serde(default)]
    pub uploaded: bool,

    /// Input codec as reported by the probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_codec: Option<String>,

    /// Input resolution as reported by the probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_height: Option<u32>,

    /// Final output codec (recorded on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_codec: Option<String>,

    /// Final output size in bytes (recorded on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<i64>,

    /// Failure reason (recorded on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the `Created` state.
    pub fn new(
        id: impl Into<JobId>,
        source_url: impl Into<String>,
        input_container: impl Into<String>,
        output_container: impl Into<String>,
        target: EncodingTarget,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source_url: source_url.into(),
            input_container: input_container.into(),
            output_container: output_container.into(),
            target,
            state: JobState::Created,
            create_attempts: 0,
            uploaded: false,
            input_codec: None,
            input_width: None,
            input_height: None,
            output_codec: None,
            output_size: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to a non-terminal pipeline state.
    pub fn advance(mut self, state: JobState) -> Self {
        debug_assert!(!state.is_terminal());
        self.state = state;
        self.updated_at = Utc::now();
        self
    }

    /// Record input metadata learned from the probe.
    pub fn with_input_metadata(
        mut self,
        codec: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Self {
        self.input_codec = codec;
        self.input_width = width;
        self.input_height = height;
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job as completed.
    pub fn complete(mut self) -> Self {
        self.state = JobState::Completed;
        self.output_codec = Some(self.target.codec.clone());
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job as failed.
    pub fn fail(mut self, reason: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.error_message = Some(reason.into());
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job::new(7, "https://example.com/in.mp4", "mp4", "mp4", EncodingTarget::default())
    }

    #[test]
    fn test_new_job_state() {
        let job = sample_job();
        assert_eq!(job.state, JobState::Created);
        assert_eq!(job.create_attempts, 0);
        assert!(!job.state.is_terminal());
    }

    #[test]
    fn test_pipeline_transitions() {
        let job = sample_job()
            .advance(JobState::ContainerPending)
            .advance(JobState::Booting)
            .advance(JobState::Downloading);
        assert_eq!(job.state, JobState::Downloading);

        let done = job.complete();
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(done.output_codec.as_deref(), Some("libx264"));
        assert!(done.state.is_terminal());
    }

    #[test]
    fn test_failure_records_reason() {
        let job = sample_job().fail("download failed");
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_message.as_deref(), Some("download failed"));
    }
}
