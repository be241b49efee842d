//! The per-job pipeline state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use squash_models::{CompressRequest, Job, JobState};
use squash_runtime::{ContainerEvent, ContainerHandle, ContainerLifecycle, RuntimeError};

use crate::client::{WorkerCommands, WorkerConnector};
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorResult;
use crate::store::{JobStore, ResultSink};

/// Drives jobs through the transcode pipeline.
///
/// One container per job. Commands are gated on observed events: a
/// phase's command is only issued after the event confirming readiness
/// for that phase, so no two outbound commands ever target the same
/// container concurrently.
pub struct Orchestrator {
    runtime: Arc<dyn ContainerLifecycle>,
    connector: Arc<dyn WorkerConnector>,
    store: Arc<dyn JobStore>,
    sink: Arc<dyn ResultSink>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerLifecycle>,
        connector: Arc<dyn WorkerConnector>,
        store: Arc<dyn JobStore>,
        sink: Arc<dyn ResultSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            runtime,
            connector,
            store,
            sink,
            config,
        }
    }

    /// Run one job to a terminal state and return it.
    ///
    /// The terminal state is written through the job store (checked);
    /// intermediate progress writes are logged on failure but do not
    /// stop the pipeline. A job that got a container gets exactly one
    /// teardown, on the terminal transition.
    pub async fn handle_job(&self, job: Job) -> OrchestratorResult<Job> {
        let job_id = job.id;
        info!(%job_id, "starting job");

        let mut job = job.advance(JobState::ContainerPending);
        self.persist_progress(&job).await;

        let handle = match self.runtime.create_container(job_id).await {
            Ok(handle) => handle,
            Err(e) => {
                if let RuntimeError::ContainerCreation { attempts, .. } = &e {
                    job.create_attempts = *attempts;
                }
                error!(%job_id, error = %e, "container creation failed");
                return self.finish(job.fail(format!("container creation failed: {e}"))).await;
            }
        };

        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity);
        let monitor = {
            let runtime = Arc::clone(&self.runtime);
            let container_id = handle.id.clone();
            tokio::spawn(async move {
                if let Err(e) = runtime.monitor(&container_id, tx).await {
                    error!(%container_id, error = %e, "container monitor failed");
                }
                // The sender dropping here closes the channel; the
                // pipeline treats closure before a terminal event as a
                // job failure.
            })
        };

        let job = job.advance(JobState::Booting);
        self.persist_progress(&job).await;

        let commands = self.connector.connect(&handle);
        let job = self.drive(job, commands.as_ref(), &mut rx).await;

        monitor.abort();
        self.teardown(&handle).await;

        let job = self.finish(job).await?;

        if job.state == JobState::Completed {
            self.sink.publish(&job).await?;
            info!(%job_id, "job output published");
        }

        Ok(job)
    }

    /// Consume events until the job reaches a terminal state.
    async fn drive(
        &self,
        mut job: Job,
        commands: &dyn WorkerCommands,
        rx: &mut mpsc::Receiver<ContainerEvent>,
    ) -> Job {
        loop {
            let deadline = self.phase_deadline(job.state);
            let event = match tokio::time::timeout(deadline, rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    return job.fail("container output ended before the job finished");
                }
                Err(_) => {
                    let phase = job.state.as_str();
                    return job.fail(format!("no progress within the {phase} deadline"));
                }
            };

            debug!(job_id = %job.id, state = job.state.as_str(), ?event, "event");

            match (job.state, event) {
                (JobState::Booting, ContainerEvent::ApplicationStarted) => {
                    if let Err(e) = commands
                        .start_download(&job.source_url, &job.input_container)
                        .await
                    {
                        return job.fail(format!("download command failed: {e}"));
                    }
                    job = job.advance(JobState::Downloading);
                    self.persist_progress(&job).await;
                }

                (JobState::Downloading, ContainerEvent::DownloadCompleted) => {
                    if let Err(e) = commands.start_probe().await {
                        return job.fail(format!("probe command failed: {e}"));
                    }
                    job = job.advance(JobState::Probing);
                    self.persist_progress(&job).await;
                }
                (JobState::Downloading, ContainerEvent::DownloadFailed) => {
                    return job.fail("source download failed");
                }

                (JobState::Probing, ContainerEvent::ProbeData(probe)) => {
                    let video = probe.video_stream();
                    job = job.with_input_metadata(
                        video.map(|s| s.codec_name.clone()),
                        video.and_then(|s| s.width),
                        video.and_then(|s| s.height),
                    );

                    let request = CompressRequest::for_job(&job);
                    if let Err(e) = commands.start_compress(&request).await {
                        return job.fail(format!("compress command failed: {e}"));
                    }
                    job = job.advance(JobState::Compressing);
                    self.persist_progress(&job).await;
                }
                (JobState::Probing, ContainerEvent::ProbeFailed) => {
                    return job.fail("probe failed");
                }
                (JobState::Probing, ContainerEvent::Error(message)) => {
                    return job.fail(message);
                }

                (JobState::Compressing, ContainerEvent::CompressionStarted) => {
                    debug!(job_id = %job.id, "compression running");
                }
                (JobState::Compressing, ContainerEvent::CompressionCompleted) => {
                    return job.complete();
                }
                (JobState::Compressing, ContainerEvent::CompressionFailed) => {
                    return job.fail("compression failed");
                }

                (_, ContainerEvent::ServerFailed) => {
                    return job.fail("worker server failed");
                }
                (_, ContainerEvent::Eof) => {
                    return job.fail("container exited before the job finished");
                }
                (_, ContainerEvent::Unrecognized(line)) => {
                    debug!(job_id = %job.id, %line, "container output");
                }
                (state, ContainerEvent::Error(message)) => {
                    warn!(job_id = %job.id, state = state.as_str(), %message, "protocol error");
                }
                (state, event) => {
                    warn!(
                        job_id = %job.id,
                        state = state.as_str(),
                        ?event,
                        "event ignored in current state"
                    );
                }
            }
        }
    }

    fn phase_deadline(&self, state: JobState) -> Duration {
        match state {
            JobState::Downloading => self.config.download_deadline,
            JobState::Probing => self.config.probe_deadline,
            JobState::Compressing => self.config.compress_deadline,
            _ => self.config.boot_deadline,
        }
    }

    /// Remove the job's container. `NotFound` means someone else (or a
    /// container crash) already removed it; anything else is logged,
    /// the job outcome stands either way.
    async fn teardown(&self, handle: &ContainerHandle) {
        match self.runtime.remove_container(&handle.id).await {
            Ok(()) => debug!(container_id = %handle.id, "container removed"),
            Err(RuntimeError::NotFound(_)) => {
                warn!(container_id = %handle.id, "container already gone at teardown");
            }
            Err(e) => {
                error!(container_id = %handle.id, error = %e, "container teardown failed");
            }
        }
    }

    /// Best-effort write of intermediate pipeline progress.
    async fn persist_progress(&self, job: &Job) {
        if let Err(e) = self.store.update_job(job).await {
            warn!(job_id = %job.id, state = job.state.as_str(), error = %e, "progress write failed");
        }
    }

    /// Checked write of the terminal state.
    async fn finish(&self, job: Job) -> OrchestratorResult<Job> {
        debug_assert!(job.state.is_terminal());
        self.store.update_job(&job).await?;

        match job.state {
            JobState::Completed => info!(job_id = %job.id, "job completed"),
            _ => warn!(
                job_id = %job.id,
                reason = job.error_message.as_deref().unwrap_or("unknown"),
                "job failed"
            ),
        }

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockWorkerCommands;
    use crate::store::{MockJobStore, MockResultSink};
    use async_trait::async_trait;
    use chrono::Utc;
    use squash_models::{EncodingTarget, JobId, ProbeFormat, ProbeResult, ProbeStream};
    use squash_runtime::RuntimeResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lifecycle stub that hands out one container and replays a
    /// scripted event sequence from its monitor.
    struct StubLifecycle {
        events: Vec<ContainerEvent>,
        fail_create: bool,
        hold_open: bool,
        create_calls: AtomicUsize,
        remove_calls: AtomicUsize,
    }

    impl StubLifecycle {
        fn new(events: Vec<ContainerEvent>) -> Self {
            Self {
                events,
                fail_create: false,
                hold_open: false,
                create_calls: AtomicUsize::new(0),
                remove_calls: AtomicUsize::new(0),
            }
        }

        fn failing_create() -> Self {
            Self {
                fail_create: true,
                ..Self::new(Vec::new())
            }
        }

        /// A container that produces no output but keeps its stream
        /// open, like a hung worker.
        fn holding_open() -> Self {
            Self {
                hold_open: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl ContainerLifecycle for StubLifecycle {
        async fn create_container(&self, job_id: JobId) -> RuntimeResult<ContainerHandle> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(RuntimeError::ContainerCreation {
                    attempts: 3,
                    reason: "no such image".to_string(),
                });
            }
            Ok(ContainerHandle {
                id: "stub-container".to_string(),
                job_id,
                port: 30100,
                created_at: Utc::now(),
            })
        }

        async fn remove_container(&self, _container_id: &str) -> RuntimeResult<()> {
            self.remove_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn monitor(
            &self,
            _container_id: &str,
            events: mpsc::Sender<ContainerEvent>,
        ) -> RuntimeResult<()> {
            for event in self.events.clone() {
                if events.send(event).await.is_err() {
                    return Ok(());
                }
            }
            if self.hold_open {
                events.closed().await;
            }
            Ok(())
        }
    }

    struct StubConnector(Arc<MockWorkerCommands>);

    impl WorkerConnector for StubConnector {
        fn connect(&self, _handle: &ContainerHandle) -> Arc<dyn WorkerCommands> {
            Arc::clone(&self.0) as Arc<dyn WorkerCommands>
        }
    }

    fn sample_job() -> Job {
        Job::new(
            7,
            "https://example.com/in.mp4",
            "mp4",
            "mp4",
            EncodingTarget::default(),
        )
    }

    fn sample_probe() -> ProbeResult {
        ProbeResult {
            streams: vec![ProbeStream {
                codec_name: "h264".to_string(),
                codec_type: "video".to_string(),
                width: Some(1920),
                height: Some(1080),
                sample_rate: None,
            }],
            format: ProbeFormat::default(),
        }
    }

    fn permissive_store() -> Arc<MockJobStore> {
        let mut store = MockJobStore::new();
        store.expect_update_job().returning(|_| Ok(()));
        Arc::new(store)
    }

    fn orchestrator(
        lifecycle: Arc<StubLifecycle>,
        commands: MockWorkerCommands,
        sink: MockResultSink,
    ) -> Orchestrator {
        orchestrator_with_config(lifecycle, commands, sink, OrchestratorConfig::default())
    }

    fn orchestrator_with_config(
        lifecycle: Arc<StubLifecycle>,
        commands: MockWorkerCommands,
        sink: MockResultSink,
        config: OrchestratorConfig,
    ) -> Orchestrator {
        Orchestrator::new(
            lifecycle,
            Arc::new(StubConnector(Arc::new(commands))),
            permissive_store(),
            Arc::new(sink),
            config,
        )
    }

    #[tokio::test]
    async fn test_success_path_completes_with_one_teardown() {
        let lifecycle = Arc::new(StubLifecycle::new(vec![
            ContainerEvent::ApplicationStarted,
            ContainerEvent::DownloadCompleted,
            ContainerEvent::ProbeData(sample_probe()),
            ContainerEvent::CompressionStarted,
            ContainerEvent::CompressionCompleted,
        ]));

        let mut commands = MockWorkerCommands::new();
        commands
            .expect_start_download()
            .times(1)
            .returning(|_, _| Ok(()));
        commands.expect_start_probe().times(1).returning(|| Ok(()));
        commands
            .expect_start_compress()
            .times(1)
            .returning(|_| Ok(()));

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(1).returning(|_| Ok(()));

        let orchestrator = orchestrator(Arc::clone(&lifecycle), commands, sink);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.input_codec.as_deref(), Some("h264"));
        assert_eq!(job.input_width, Some(1920));
        assert_eq!(lifecycle.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_download_failure_never_issues_probe() {
        let lifecycle = Arc::new(StubLifecycle::new(vec![
            ContainerEvent::ApplicationStarted,
            ContainerEvent::DownloadFailed,
        ]));

        let mut commands = MockWorkerCommands::new();
        commands
            .expect_start_download()
            .times(1)
            .returning(|_, _| Ok(()));
        commands.expect_start_probe().times(0);
        commands.expect_start_compress().times(0);

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(0);

        let orchestrator = orchestrator(Arc::clone(&lifecycle), commands, sink);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_message.as_deref(), Some("source download failed"));
        assert_eq!(lifecycle.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_failed_is_terminal_in_any_state() {
        let lifecycle = Arc::new(StubLifecycle::new(vec![ContainerEvent::ServerFailed]));

        let mut commands = MockWorkerCommands::new();
        commands.expect_start_download().times(0);

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(0);

        let orchestrator = orchestrator(Arc::clone(&lifecycle), commands, sink);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(lifecycle.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_close_before_terminal_event_fails_job() {
        // Monitor ends after the boot sentinel; the channel closing is
        // treated as a failure, not a hang.
        let lifecycle = Arc::new(StubLifecycle::new(vec![ContainerEvent::ApplicationStarted]));

        let mut commands = MockWorkerCommands::new();
        commands
            .expect_start_download()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(0);

        let orchestrator = orchestrator(Arc::clone(&lifecycle), commands, sink);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(lifecycle.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_phase_deadline_fails_silent_container() {
        // The container stays up and its stream stays open but no
        // sentinel ever arrives; the boot deadline must fail the job.
        let lifecycle = Arc::new(StubLifecycle::holding_open());

        let mut commands = MockWorkerCommands::new();
        commands.expect_start_download().times(0);

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(0);

        let config = OrchestratorConfig {
            boot_deadline: Duration::from_millis(50),
            ..OrchestratorConfig::default()
        };
        let orchestrator =
            orchestrator_with_config(Arc::clone(&lifecycle), commands, sink, config);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert!(job
            .error_message
            .as_deref()
            .unwrap()
            .contains("booting deadline"));
        assert_eq!(lifecycle.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_failure_fails_job_without_teardown() {
        let lifecycle = Arc::new(StubLifecycle::failing_create());

        let mut commands = MockWorkerCommands::new();
        commands.expect_start_download().times(0);

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(0);

        let orchestrator = orchestrator(Arc::clone(&lifecycle), commands, sink);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.create_attempts, 3);
        assert_eq!(lifecycle.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.remove_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_parse_error_fails_job() {
        let lifecycle = Arc::new(StubLifecycle::new(vec![
            ContainerEvent::ApplicationStarted,
            ContainerEvent::DownloadCompleted,
            ContainerEvent::Error("error parsing probe data: expected value".to_string()),
        ]));

        let mut commands = MockWorkerCommands::new();
        commands
            .expect_start_download()
            .times(1)
            .returning(|_, _| Ok(()));
        commands.expect_start_probe().times(1).returning(|| Ok(()));
        commands.expect_start_compress().times(0);

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(0);

        let orchestrator = orchestrator(Arc::clone(&lifecycle), commands, sink);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert!(job.error_message.unwrap().contains("probe data"));
    }

    #[tokio::test]
    async fn test_unrecognized_lines_do_not_change_state() {
        let lifecycle = Arc::new(StubLifecycle::new(vec![
            ContainerEvent::Unrecognized("worker booting".to_string()),
            ContainerEvent::ApplicationStarted,
            ContainerEvent::Unrecognized("cache warm".to_string()),
            ContainerEvent::DownloadCompleted,
            ContainerEvent::ProbeData(sample_probe()),
            ContainerEvent::CompressionCompleted,
        ]));

        let mut commands = MockWorkerCommands::new();
        commands
            .expect_start_download()
            .times(1)
            .returning(|_, _| Ok(()));
        commands.expect_start_probe().times(1).returning(|| Ok(()));
        commands
            .expect_start_compress()
            .times(1)
            .returning(|_| Ok(()));

        let mut sink = MockResultSink::new();
        sink.expect_publish().times(1).returning(|_| Ok(()));

        let orchestrator = orchestrator(Arc::clone(&lifecycle), commands, sink);
        let job = orchestrator.handle_job(sample_job()).await.unwrap();

        assert_eq!(job.state, JobState::Completed);
    }
}
