//! Container lifecycle manager.
//!
//! Owns the Docker client, the one-time worker image pull, and the
//! registry of active per-job containers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions, LogOutput,
    RemoveContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use squash_models::JobId;

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::events::{ContainerEvent, SentinelParser};
use crate::retry::RetryPolicy;

/// Port the worker's control plane listens on inside the container.
const WORKER_CONTROL_PORT: &str = "8080/tcp";

/// A live per-job worker container.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    /// Runtime-assigned container id
    pub id: String,
    /// Owning job
    pub job_id: JobId,
    /// Loopback host port mapped to the worker's control plane
    pub port: u16,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Lifecycle operations the orchestrator depends on.
///
/// A trait seam so the state machine can be driven by a scripted
/// implementation in tests.
#[async_trait]
pub trait ContainerLifecycle: Send + Sync {
    /// Create and start a container for a job. Bounded retries happen
    /// inside; on error no container exists.
    async fn create_container(&self, job_id: JobId) -> RuntimeResult<ContainerHandle>;

    /// Force-remove a container and evict it from the active registry.
    /// Removing an already-removed id reports `NotFound`.
    async fn remove_container(&self, container_id: &str) -> RuntimeResult<()>;

    /// Attach to the container's combined output and forward typed
    /// events until the stream ends. Clean end-of-stream emits `Eof`
    /// and returns `Ok`; stream I/O failure is returned as an error,
    /// never encoded as an event.
    async fn monitor(
        &self,
        container_id: &str,
        events: mpsc::Sender<ContainerEvent>,
    ) -> RuntimeResult<()>;
}

/// Docker-backed container lifecycle manager.
pub struct ContainerRuntime {
    docker: Docker,
    config: RuntimeConfig,
    retry: RetryPolicy,
    containers: Arc<RwLock<HashMap<JobId, ContainerHandle>>>,
    next_port: AtomicU16,
}

impl ContainerRuntime {
    /// Connect to the local Docker daemon.
    pub fn connect(config: RuntimeConfig) -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        let next_port = AtomicU16::new(config.port_base);

        Ok(Self {
            docker,
            config,
            retry: RetryPolicy::default(),
            containers: Arc::new(RwLock::new(HashMap::new())),
            next_port,
        })
    }

    /// Override the creation retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Authenticate against the registry and pull the worker image.
    ///
    /// Called exactly once at startup; failure is fatal to the process.
    pub async fn initialize(&self) -> RuntimeResult<()> {
        let username = self
            .config
            .registry_username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| RuntimeError::RegistryAuth("missing registry username".into()))?;
        let password = self
            .config
            .registry_password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RuntimeError::RegistryAuth("missing registry password".into()))?;

        let credentials = DockerCredentials {
            username: Some(username),
            password: Some(password),
            ..Default::default()
        };

        info!(image = %self.config.worker_image, "pulling worker image");

        let options = CreateImageOptions {
            from_image: self.config.worker_image.clone(),
            ..Default::default()
        };

        let mut pull = self
            .docker
            .create_image(Some(options), None, Some(credentials));

        while let Some(progress) = pull.next().await {
            // Error text from the pull never carries credentials
            progress.map_err(|e| RuntimeError::ImagePull(e.to_string()))?;
        }

        info!(image = %self.config.worker_image, "worker image ready");
        Ok(())
    }

    /// Snapshot of the active-container registry.
    pub async fn active_containers(&self) -> Vec<ContainerHandle> {
        self.containers.read().await.values().cloned().collect()
    }

    /// Run a Docker call under the configured operation bound.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, bollard::errors::Error>>,
    ) -> RuntimeResult<T> {
        match tokio::time::timeout(self.config.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RuntimeError::Docker(e)),
            Err(_) => Err(RuntimeError::Timeout(self.config.op_timeout)),
        }
    }

    /// One creation attempt. On failure the id of a partially created
    /// container (created but not started) is handed back for cleanup.
    async fn try_create(
        &self,
        job_id: JobId,
        port: u16,
    ) -> Result<ContainerHandle, (Option<String>, RuntimeError)> {
        let name = format!("squash-worker-{job_id}");

        let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::from([(
            WORKER_CONTROL_PORT.to_string(),
            Some(vec![PortBinding {
                host_ip: Some("127.0.0.1".to_string()),
                host_port: Some(port.to_string()),
            }]),
        )]);

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(self.config.worker_image.clone()),
            exposed_ports: Some(HashMap::from([(
                WORKER_CONTROL_PORT.to_string(),
                HashMap::new(),
            )])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name,
            ..Default::default()
        };

        let response = self
            .bounded(
                self.docker
                    .create_container(Some(options), container_config),
            )
            .await
            .map_err(|e| (None, e))?;

        let handle = ContainerHandle {
            id: response.id.clone(),
            job_id,
            port,
            created_at: Utc::now(),
        };

        self.bounded(self.docker.start_container::<String>(&response.id, None))
            .await
            .map_err(|e| (Some(response.id), e))?;

        Ok(handle)
    }

    /// Force-remove a container left behind by a failed attempt.
    async fn cleanup_partial(&self, container_id: &str) {
        let result = self
            .bounded(self.docker.remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            ))
            .await;

        if let Err(e) = result {
            warn!(container_id, error = %e, "failed to remove partially created container");
        }
    }
}

#[async_trait]
impl ContainerLifecycle for ContainerRuntime {
    async fn create_container(&self, job_id: JobId) -> RuntimeResult<ContainerHandle> {
        if self.containers.read().await.contains_key(&job_id) {
            return Err(RuntimeError::JobAlreadyActive(job_id));
        }

        let port = self.next_port.fetch_add(1, Ordering::SeqCst);

        let result = self
            .retry
            .run(
                |_| {
                    Box::pin(async move {
                        self.try_create(job_id, port)
                            .await
                            .map_err(|(partial, e)| (partial, e.to_string()))
                    })
                },
                |id| Box::pin(async move { self.cleanup_partial(&id).await }),
            )
            .await;

        match result {
            Ok(handle) => {
                info!(
                    %job_id,
                    container_id = %handle.id,
                    port,
                    "created and started worker container"
                );
                self.containers.write().await.insert(job_id, handle.clone());
                Ok(handle)
            }
            Err((attempts, reason)) => Err(RuntimeError::ContainerCreation { attempts, reason }),
        }
    }

    async fn remove_container(&self, container_id: &str) -> RuntimeResult<()> {
        let result = self
            .bounded(self.docker.remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            ))
            .await;

        settle_removal(&self.containers, container_id, result).await
    }

    async fn monitor(
        &self,
        container_id: &str,
        events: mpsc::Sender<ContainerEvent>,
    ) -> RuntimeResult<()> {
        let options = AttachContainerOptions::<String> {
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(true),
            ..Default::default()
        };

        let AttachContainerResults { mut output, .. } = self
            .docker
            .attach_container(container_id, Some(options))
            .await?;

        let mut parser = SentinelParser::new();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = output.next().await {
            let bytes = match chunk {
                Ok(LogOutput::StdOut { message })
                | Ok(LogOutput::StdErr { message })
                | Ok(LogOutput::Console { message }) => message,
                Ok(LogOutput::StdIn { .. }) => continue,
                Err(e) => return Err(RuntimeError::Stream(e.to_string())),
            };

            pending.extend_from_slice(&bytes);

            // Chunks are not line-aligned; drain complete lines only
            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                if let Some(event) = parser.feed(&line) {
                    if events.send(event).await.is_err() {
                        // Consumer is gone; stop reading
                        return Ok(());
                    }
                }
            }
        }

        // Flush a trailing partial line, then signal clean termination
        if !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending).to_string();
            if let Some(event) = parser.feed(&line) {
                let _ = events.send(event).await;
            }
        }

        let _ = events.send(ContainerEvent::Eof).await;
        Ok(())
    }
}

/// Apply a removal outcome to the active registry.
///
/// An id is evicted iff the runtime confirmed the removal. A 404 from
/// the runtime maps to `NotFound`; it and every other failure leave the
/// registry untouched.
async fn settle_removal(
    containers: &RwLock<HashMap<JobId, ContainerHandle>>,
    container_id: &str,
    result: RuntimeResult<()>,
) -> RuntimeResult<()> {
    match result {
        Ok(()) => {
            let mut containers = containers.write().await;
            containers.retain(|_, handle| handle.id != container_id);
            debug!(container_id, "removed worker container");
            Ok(())
        }
        Err(RuntimeError::Docker(e)) if RuntimeError::is_not_found(&e) => {
            Err(RuntimeError::NotFound(container_id.to_string()))
        }
        Err(e) => Err(e),
    }
}
