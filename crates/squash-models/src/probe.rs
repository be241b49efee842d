//! FFprobe result types.
//!
//! These mirror the JSON layout of `ffprobe -print_format json
//! -show_format -show_streams`. Every field is defaultable: the worker
//! forwards whatever ffprobe printed, and an empty document must still
//! deserialize.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One stream (video or audio) of a probed file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_name: String,
    /// "video" or "audio"
    #[serde(default)]
    pub codec_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Audio sample rate; ffprobe reports it as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<String>,
}

/// Container-level metadata of a probed file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProbeFormat {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub nb_streams: u32,
    #[serde(default)]
    pub format_name: String,
}

/// Full probe result: produced once per job by the worker, consumed once
/// by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProbeResult {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: ProbeFormat,
}

impl ProbeResult {
    /// First video stream, if any.
    pub fn video_stream(&self) -> Option<&ProbeStream> {
        self.streams.iter().find(|s| s.codec_type == "video")
    }

    /// First audio stream, if any.
    pub fn audio_stream(&self) -> Option<&ProbeStream> {
        self.streams.iter().find(|s| s.codec_type == "audio")
    }
}
