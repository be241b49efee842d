//! Worker command client.
//!
//! Commands are fire-and-forget HTTP posts to the worker's control
//! plane; completion of the commanded work is learned exclusively from
//! the container's event stream, never from the response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use squash_models::{CompressRequest, DownloadRequest};
use squash_runtime::ContainerHandle;

use crate::error::CommandError;

/// Commands the orchestrator can issue to one worker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkerCommands: Send + Sync {
    /// `POST /download`. The worker acknowledges with 201 (or 202).
    async fn start_download(&self, url: &str, container: &str) -> Result<(), CommandError>;

    /// `POST /probe`. Synchronous on the worker side; acknowledged with
    /// 200. The probe payload still arrives through the event stream.
    async fn start_probe(&self) -> Result<(), CommandError>;

    /// `POST /compress`. The worker acknowledges with 201.
    async fn start_compress(&self, request: &CompressRequest) -> Result<(), CommandError>;
}

/// HTTP client for one worker's control plane.
pub struct WorkerClient {
    client: reqwest::Client,
    base_url: String,
}

impl WorkerClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post<B: serde::Serialize>(
        &self,
        command: &'static str,
        body: Option<&B>,
        accepted: &[u16],
    ) -> Result<(), CommandError> {
        let url = format!("{}/{command}", self.base_url);
        debug!(%url, "issuing worker command");

        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let status = request.send().await?.status().as_u16();
        if accepted.contains(&status) {
            Ok(())
        } else {
            Err(CommandError::UnexpectedStatus { command, status })
        }
    }
}

#[async_trait]
impl WorkerCommands for WorkerClient {
    async fn start_download(&self, url: &str, container: &str) -> Result<(), CommandError> {
        let body = DownloadRequest {
            url: url.to_string(),
            container: container.to_string(),
        };
        self.post("download", Some(&body), &[201, 202]).await
    }

    async fn start_probe(&self) -> Result<(), CommandError> {
        self.post::<()>("probe", None, &[200]).await
    }

    async fn start_compress(&self, request: &CompressRequest) -> Result<(), CommandError> {
        self.post("compress", Some(request), &[201]).await
    }
}

/// Builds the command client for a freshly created container.
///
/// A seam so pipeline tests can substitute scripted commands for real
/// HTTP.
pub trait WorkerConnector: Send + Sync {
    fn connect(&self, handle: &ContainerHandle) -> Arc<dyn WorkerCommands>;
}

/// Connects to the loopback port the container's control plane is
/// published on.
pub struct HttpWorkerConnector {
    host: String,
}

impl HttpWorkerConnector {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl WorkerConnector for HttpWorkerConnector {
    fn connect(&self, handle: &ContainerHandle) -> Arc<dyn WorkerCommands> {
        Arc::new(WorkerClient::new(&self.host, handle.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_start_download_accepts_201() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .and(body_json_string(
                r#"{"url":"https://example.com/in.mp4","container":"mp4"}"#,
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = WorkerClient::with_base_url(server.uri());
        client
            .start_download("https://example.com/in.mp4", "mp4")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_start_probe_rejects_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/probe"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WorkerClient::with_base_url(server.uri());
        let err = client.start_probe().await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::UnexpectedStatus {
                command: "probe",
                status: 500
            }
        ));
    }

    #[tokio::test]
    async fn test_start_compress_sends_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/compress"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let request = CompressRequest {
            input_container: "mp4".to_string(),
            output_container: "webm".to_string(),
            max_width: 1280,
            max_height: 720,
            codec: "libvpx-vp9".to_string(),
            crf: 30,
            preset: "medium".to_string(),
            audio_bitrate: 128,
        };

        let client = WorkerClient::with_base_url(server.uri());
        client.start_compress(&request).await.unwrap();

        let received = &server.received_requests().await.unwrap()[0];
        let body: serde_json::Value = serde_json::from_slice(&received.body).unwrap();
        assert_eq!(body["inputContainer"], "mp4");
        assert_eq!(body["maxWidth"], 1280);
    }
}
