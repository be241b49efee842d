//! FFprobe media inspection.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use squash_models::ProbeResult;

use crate::error::{MediaError, MediaResult};

/// Probe a media file.
///
/// Returns the parsed stream/format metadata exactly as ffprobe reported
/// it; the caller decides what to do with it.
pub async fn run_ffprobe(path: impl AsRef<Path>) -> MediaResult<ProbeResult> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: ProbeResult = serde_json::from_slice(&output.stdout)?;
    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = run_ffprobe("/nonexistent/input.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
