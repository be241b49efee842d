//! Source file fetching.
//!
//! The fetch itself is an external `curl` process so it can outlive the
//! HTTP request that started it; the expected byte length is learned up
//! front with a HEAD request and checked against the file on disk once
//! curl exits.

use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Ask the origin for the expected byte length of a file.
///
/// A missing Content-Length is an error: without it the download cannot
/// be validated.
pub async fn content_length(url: &str) -> MediaResult<u64> {
    let client = reqwest::Client::new();
    let resp = client
        .head(url)
        .send()
        .await
        .map_err(|e| MediaError::fetch_failed(format!("HEAD request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(MediaError::fetch_failed(format!(
            "HEAD request returned {}",
            resp.status()
        )));
    }

    resp.content_length()
        .ok_or_else(|| MediaError::fetch_failed("origin did not report Content-Length"))
}

/// Start downloading `url` to `path` with a detached curl process.
///
/// Returns the child; the caller waits on it and then validates the
/// result with [`verify_fetched`].
pub fn spawn_fetch(url: &str, path: impl AsRef<Path>) -> MediaResult<Child> {
    which::which("curl").map_err(|_| MediaError::CurlNotFound)?;

    let path = path.as_ref();
    debug!("fetching {} to {}", url, path.display());

    let child = Command::new("curl")
        .arg("-L") // follow redirects
        .arg("-f") // fail on HTTP errors instead of saving the error page
        .arg("-s")
        .arg("-o")
        .arg(path)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(child)
}

/// Check that a fetched file exists and has the expected byte length.
pub async fn verify_fetched(path: impl AsRef<Path>, expected: u64) -> MediaResult<()> {
    let path = path.as_ref();

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;

    if meta.len() != expected {
        return Err(MediaError::SizeMismatch {
            expected,
            actual: meta.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_verify_fetched_matches() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();

        assert!(verify_fetched(file.path(), 5).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_fetched_size_mismatch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();

        let err = verify_fetched(file.path(), 99).await.unwrap_err();
        assert!(matches!(
            err,
            MediaError::SizeMismatch {
                expected: 99,
                actual: 5
            }
        ));
    }

    #[tokio::test]
    async fn test_verify_fetched_missing_file() {
        let err = verify_fetched("/nonexistent/file.mp4", 1).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
