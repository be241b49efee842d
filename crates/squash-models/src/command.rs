//! Worker command request bodies.
//!
//! Field names are camelCase on the wire to match the worker's HTTP
//! surface.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::job::{EncodingTarget, Job};

/// Body of `POST /download`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Pre-signed URL of the source file
    #[validate(length(min = 1, message = "url is required"))]
    pub url: String,
    /// Container format the file will be saved as (e.g. "mp4")
    #[validate(length(min = 1, message = "container is required"))]
    pub container: String,
}

/// Body of `POST /compress`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompressRequest {
    #[validate(length(min = 1, message = "inputContainer is required"))]
    pub input_container: String,
    #[validate(length(min = 1, message = "outputContainer is required"))]
    pub output_container: String,
    #[validate(range(min = 2, message = "maxWidth must be at least 2"))]
    pub max_width: u32,
    #[validate(range(min = 2, message = "maxHeight must be at least 2"))]
    pub max_height: u32,
    #[validate(length(min = 1, message = "codec is required"))]
    pub codec: String,
    #[validate(range(max = 51, message = "crf must be 0-51"))]
    pub crf: u8,
    #[validate(length(min = 1, message = "preset is required"))]
    pub preset: String,
    #[validate(range(min = 32, max = 512, message = "audioBitrate must be 32-512 kbit/s"))]
    pub audio_bitrate: u32,
}

impl CompressRequest {
    /// Build the compress command for a job from its encoding target.
    pub fn for_job(job: &Job) -> Self {
        let EncodingTarget {
            codec,
            max_width,
            max_height,
            crf,
            preset,
            audio_bitrate,
        } = job.target.clone();

        Self {
            input_container: job.input_container.clone(),
            output_container: job.output_container.clone(),
            max_width,
            max_height,
            codec,
            crf,
            preset,
            audio_bitrate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{EncodingTarget, Job};

    #[test]
    fn test_wire_names_are_camel_case() {
        let req = DownloadRequest {
            url: "https://example.com/in.mp4".to_string(),
            container: "mp4".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("url").is_some());
        assert!(json.get("container").is_some());

        let job = Job::new(1, "https://example.com/in.mp4", "mp4", "webm", EncodingTarget::default());
        let compress = serde_json::to_value(CompressRequest::for_job(&job)).unwrap();
        assert!(compress.get("inputContainer").is_some());
        assert!(compress.get("outputContainer").is_some());
        assert!(compress.get("maxWidth").is_some());
        assert!(compress.get("audioBitrate").is_some());
    }

    #[test]
    fn test_validation() {
        let req = DownloadRequest {
            url: String::new(),
            container: String::new(),
        };
        assert!(req.validate().is_err());

        let job = Job::new(1, "https://example.com/in.mp4", "mp4", "mp4", EncodingTarget::default());
        let mut compress = CompressRequest::for_job(&job);
        assert!(compress.validate().is_ok());

        compress.crf = 99;
        assert!(compress.validate().is_err());
    }

    #[test]
    fn test_for_job_copies_target() {
        let target = EncodingTarget {
            codec: "libx265".to_string(),
            max_width: 1280,
            max_height: 720,
            crf: 28,
            preset: "slow".to_string(),
            audio_bitrate: 96,
        };
        let job = Job::new(42, "https://example.com/in.mkv", "mkv", "mp4", target);
        let req = CompressRequest::for_job(&job);

        assert_eq!(req.input_container, "mkv");
        assert_eq!(req.output_container, "mp4");
        assert_eq!(req.codec, "libx265");
        assert_eq!(req.max_width, 1280);
        assert_eq!(req.audio_bitrate, 96);
    }
}
