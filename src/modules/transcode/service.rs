use super::dto::SubmitJobRequest;
use super::error::{JobError, TargetError};
use super::model::{JobResult, JobStatus, TargetOutcome, TargetProfile};
use super::repository::ArtifactRepository;
use crate::infrastructure::encoder::ProgressEvent;
use crate::infrastructure::storage::ArtifactLocator;
use crate::state::AppState;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct TranscodeService;

impl TranscodeService {
    /// Accept a submission, register it, and spawn the job task.
    ///
    /// The job runs every target to completion whether or not anyone polls;
    /// abandoning a job simply means no longer looking at it.
    pub async fn submit(state: AppState, req: SubmitJobRequest) -> Result<Uuid, JobError> {
        let targets = match req.targets {
            Some(list) => list.into_iter().map(TargetProfile::from).collect(),
            None => TargetProfile::default_ladder(),
        };

        let source = PathBuf::from(&req.source_path);
        match tokio::fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(JobError::SourceMissing(req.source_path)),
        }

        let job_id = Uuid::new_v4();
        Self::register(&state, job_id, &targets)?;
        info!("🎬 Job {job_id} accepted with {} targets", targets.len());

        tokio::spawn(Self::run(state, job_id, source, targets, req.uploader));

        Ok(job_id)
    }

    /// Validate the target list and claim `job_id` in the progress table and
    /// the registry. Rolls the progress row back if the registry claim fails.
    pub fn register(
        state: &AppState,
        job_id: Uuid,
        targets: &[TargetProfile],
    ) -> Result<(), JobError> {
        if targets.is_empty() {
            return Err(JobError::NoTargets);
        }
        if let Some(bad) = targets.iter().find(|t| t.width == 0 || t.height == 0) {
            return Err(JobError::InvalidTarget {
                label: bad.label.clone(),
            });
        }

        state.progress.start_job(job_id, targets.len())?;
        if let Err(e) = state.jobs.create(job_id, targets) {
            state.progress.end_job(job_id);
            return Err(e);
        }
        Ok(())
    }

    /// Drive every target of one job concurrently and resolve the job-level
    /// status once all of them are terminal.
    ///
    /// One future per target, all joined here: nothing outlives this call.
    /// A failed target never cancels its siblings. Wall-clock cost is the
    /// slowest single rendition, not the sum.
    pub async fn run(
        state: AppState,
        job_id: Uuid,
        source: PathBuf,
        targets: Vec<TargetProfile>,
        uploader: Option<String>,
    ) -> JobResult {
        state.jobs.mark_running(job_id);

        if let Err(e) = tokio::fs::create_dir_all(&state.config.scratch_dir).await {
            warn!(
                "Could not create scratch dir {}: {e}",
                state.config.scratch_dir.display()
            );
        }

        let runs = targets.iter().enumerate().map(|(index, profile)| {
            Self::run_target(&state, job_id, &source, index, profile, uploader.as_deref())
        });
        let outcomes: Vec<TargetOutcome> = join_all(runs).await;

        let status = JobResult::resolve_status(&outcomes);
        state.jobs.complete(job_id, status, outcomes.clone());

        match status {
            JobStatus::Succeeded => {
                info!("✅ Job {job_id} finished: all {} targets done", outcomes.len())
            }
            JobStatus::PartiallyFailed => warn!("Job {job_id} finished with partial failures"),
            _ => error!("❌ Job {job_id} failed on every target"),
        }

        JobResult {
            job_id,
            status,
            targets: outcomes,
        }
    }

    async fn run_target(
        state: &AppState,
        job_id: Uuid,
        source: &Path,
        index: usize,
        profile: &TargetProfile,
        uploader: Option<&str>,
    ) -> TargetOutcome {
        let filename = format!("{}.mp4", profile.label);
        let scratch = state.config.scratch_dir.join(format!("{job_id}_{filename}"));
        let key = format!("{job_id}/{filename}");

        let result =
            Self::encode_and_store(state, job_id, source, &scratch, index, profile, &key).await;

        let _ = tokio::fs::remove_file(&scratch).await;

        match result {
            Ok(locator) => {
                state.progress.mark_done(job_id, index);

                if let Some(db) = &state.db {
                    if let Err(e) = ArtifactRepository::record_artifact(
                        db,
                        job_id,
                        uploader,
                        &filename,
                        locator.as_str(),
                    )
                    .await
                    {
                        warn!("Failed to register artifact metadata for {key}: {e}");
                    }
                }

                TargetOutcome::done(profile.clone(), locator)
            }
            Err(err) => {
                let last_percent = state
                    .progress
                    .snapshot(job_id)
                    .and_then(|row| row.get(index).copied())
                    .unwrap_or(0.0);
                error!("Target {} of job {job_id} failed: {err}", profile.label);
                TargetOutcome::failed(profile.clone(), last_percent, (&err).into())
            }
        }
    }

    async fn encode_and_store(
        state: &AppState,
        job_id: Uuid,
        source: &Path,
        scratch: &Path,
        index: usize,
        profile: &TargetProfile,
        key: &str,
    ) -> Result<ArtifactLocator, TargetError> {
        let (tx, mut rx) = mpsc::channel::<ProgressEvent>(32);

        // The encoder drops its sender on exit, which ends this drain loop;
        // events for one target are applied in the order they arrive.
        let progress = state.progress.clone();
        let forward = async move {
            while let Some(event) = rx.recv().await {
                progress.report(job_id, index, event.percent);
            }
        };

        let encode = state.encoder.encode(source, scratch, profile, tx);
        let (encoded, ()) = tokio::join!(encode, forward);
        let written = encoded?;
        debug!("Encoded {} ({written} bytes), storing as {key}", profile.label);

        // Only a confirmed store makes the target durable enough to pin.
        let locator = state.sink.store(scratch, key).await?;
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{AppConfig, StorageBackend};
    use crate::infrastructure::encoder::{EncodeError, Encoder};
    use crate::infrastructure::storage::{
        ArtifactSink, MockArtifactSink, StoreError, local::LocalDiskSink,
    };
    use crate::modules::transcode::model::{FailureKind, TargetState};
    use crate::modules::transcode::progress::ProgressTable;
    use crate::modules::transcode::registry::JobRegistry;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Encoder stand-in scripted per target label. Targets without a script
    /// succeed silently.
    #[derive(Default)]
    struct ScriptedEncoder {
        plans: HashMap<String, Plan>,
    }

    enum Plan {
        Succeed { events: Vec<f32> },
        Fail { events: Vec<f32> },
        /// Send the events, then hold the encode open until released.
        Hold { events: Vec<f32>, gate: Arc<Notify> },
    }

    impl ScriptedEncoder {
        fn with(mut self, label: &str, plan: Plan) -> Self {
            self.plans.insert(label.to_string(), plan);
            self
        }
    }

    #[async_trait]
    impl Encoder for ScriptedEncoder {
        async fn encode(
            &self,
            _source: &Path,
            output: &Path,
            profile: &TargetProfile,
            progress: mpsc::Sender<ProgressEvent>,
        ) -> Result<u64, EncodeError> {
            let send_all = |events: &[f32]| {
                let events = events.to_vec();
                let progress = progress.clone();
                async move {
                    for percent in events {
                        let _ = progress.send(ProgressEvent { percent, fps: None }).await;
                    }
                }
            };

            match self.plans.get(&profile.label) {
                Some(Plan::Succeed { events }) => {
                    send_all(events).await;
                    tokio::fs::write(output, profile.label.as_bytes()).await.unwrap();
                    Ok(profile.label.len() as u64)
                }
                Some(Plan::Fail { events }) => {
                    send_all(events).await;
                    Err(EncodeError::Failed {
                        status: 1,
                        detail: format!("scripted failure for {}", profile.label),
                    })
                }
                Some(Plan::Hold { events, gate }) => {
                    send_all(events).await;
                    gate.notified().await;
                    tokio::fs::write(output, profile.label.as_bytes()).await.unwrap();
                    Ok(profile.label.len() as u64)
                }
                None => {
                    tokio::fs::write(output, profile.label.as_bytes()).await.unwrap();
                    Ok(profile.label.len() as u64)
                }
            }
        }
    }

    fn test_state(
        encoder: Arc<dyn Encoder>,
        sink: Arc<dyn ArtifactSink>,
        scratch: &Path,
    ) -> AppState {
        let config = AppConfig {
            server_port: 0,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            scratch_dir: scratch.to_path_buf(),
            storage_backend: StorageBackend::Local,
            artifact_root: scratch.join("artifacts"),
            minio_url: None,
            minio_bucket: None,
            minio_access_key: None,
            minio_secret_key: None,
            database_url: None,
            job_retention_secs: 600,
        };
        AppState::new(
            config,
            ProgressTable::new(),
            JobRegistry::new(),
            encoder,
            sink,
            None,
        )
    }

    fn profiles(specs: &[(&str, u32, u32)]) -> Vec<TargetProfile> {
        specs
            .iter()
            .map(|(label, w, h)| TargetProfile::new(*label, *w, *h))
            .collect()
    }

    async fn write_source(dir: &Path) -> PathBuf {
        let path = dir.join("source.mp4");
        tokio::fs::write(&path, b"source bytes").await.unwrap();
        path
    }

    #[tokio::test]
    async fn all_targets_succeeding_resolves_to_succeeded() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let encoder = Arc::new(
            ScriptedEncoder::default()
                .with("720p", Plan::Succeed { events: vec![30.0, 80.0] })
                .with("360p", Plan::Succeed { events: vec![50.0] }),
        );
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        let job_id = Uuid::new_v4();
        let targets = profiles(&[("720p", 1280, 720), ("360p", 640, 360)]);
        TranscodeService::register(&state, job_id, &targets).unwrap();

        let result = TranscodeService::run(state.clone(), job_id, source, targets, None).await;

        assert_eq!(result.status, JobStatus::Succeeded);
        assert!(result.targets.iter().all(|t| t.state == TargetState::Done));
        assert!(result.targets.iter().all(|t| t.artifact.is_some()));
        assert_eq!(state.progress.overall(job_id), Some(100.0));

        let stored = dir.path().join("store").join(format!("{job_id}/720p.mp4"));
        assert!(stored.exists());

        let record = state.jobs.get(job_id).unwrap();
        assert_eq!(record.status, JobStatus::Succeeded);
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn one_failed_target_does_not_cancel_its_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let encoder = Arc::new(
            ScriptedEncoder::default()
                .with("720p", Plan::Succeed { events: vec![100.0] })
                .with("480p", Plan::Fail { events: vec![12.0] })
                .with("360p", Plan::Succeed { events: vec![100.0] }),
        );
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        let job_id = Uuid::new_v4();
        let targets = profiles(&[("720p", 1280, 720), ("480p", 854, 480), ("360p", 640, 360)]);
        TranscodeService::register(&state, job_id, &targets).unwrap();

        let result = TranscodeService::run(state, job_id, source, targets, None).await;

        assert_eq!(result.status, JobStatus::PartiallyFailed);
        assert_eq!(result.targets[0].state, TargetState::Done);
        assert_eq!(result.targets[2].state, TargetState::Done);
        assert!(result.targets[0].artifact.is_some());
        assert!(result.targets[2].artifact.is_some());

        let failed = &result.targets[1];
        assert_eq!(failed.state, TargetState::Failed);
        assert!(failed.artifact.is_none());
        let failure = failed.error.as_ref().unwrap();
        assert_eq!(failure.kind, FailureKind::Encode);
        assert!(failure.message.contains("scripted failure"));
    }

    #[tokio::test]
    async fn every_target_failing_resolves_to_failed() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let encoder = Arc::new(
            ScriptedEncoder::default()
                .with("720p", Plan::Fail { events: vec![] })
                .with("360p", Plan::Fail { events: vec![] }),
        );
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        let job_id = Uuid::new_v4();
        let targets = profiles(&[("720p", 1280, 720), ("360p", 640, 360)]);
        TranscodeService::register(&state, job_id, &targets).unwrap();

        let result = TranscodeService::run(state, job_id, source, targets, None).await;

        assert_eq!(result.status, JobStatus::Failed);
        assert!(result.targets.iter().all(|t| t.state == TargetState::Failed));
    }

    #[tokio::test]
    async fn sink_failure_after_a_clean_encode_reads_as_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let encoder = Arc::new(
            ScriptedEncoder::default().with("720p", Plan::Succeed { events: vec![100.0] }),
        );

        let mut sink = MockArtifactSink::new();
        sink.expect_store().returning(|_, key| {
            Err(StoreError::Upload {
                key: key.to_string(),
                detail: "bucket unavailable".to_string(),
            })
        });
        let state = test_state(encoder, Arc::new(sink), dir.path());

        let job_id = Uuid::new_v4();
        let targets = profiles(&[("720p", 1280, 720)]);
        TranscodeService::register(&state, job_id, &targets).unwrap();

        let result = TranscodeService::run(state, job_id, source, targets, None).await;

        assert_eq!(result.status, JobStatus::Failed);
        let failure = result.targets[0].error.as_ref().unwrap();
        assert_eq!(failure.kind, FailureKind::Store);
        assert!(failure.message.contains("bucket unavailable"));
    }

    #[tokio::test]
    async fn mid_run_overall_progress_averages_fast_and_slow_targets() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let gate = Arc::new(Notify::new());
        let encoder = Arc::new(
            ScriptedEncoder::default()
                .with("720p", Plan::Succeed { events: vec![100.0] })
                .with(
                    "360p",
                    Plan::Hold {
                        events: vec![40.0],
                        gate: gate.clone(),
                    },
                ),
        );
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        let job_id = Uuid::new_v4();
        let targets = profiles(&[("720p", 1280, 720), ("360p", 640, 360)]);
        TranscodeService::register(&state, job_id, &targets).unwrap();

        let handle = tokio::spawn(TranscodeService::run(
            state.clone(),
            job_id,
            source,
            targets,
            None,
        ));

        // The fast target pins to 100 and the slow one sits at 40: average 70.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if state.progress.overall(job_id) == Some(70.0) {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "overall progress never reached 70"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        gate.notify_one();
        let result = handle.await.unwrap();
        assert_eq!(result.status, JobStatus::Succeeded);
        assert_eq!(state.progress.overall(job_id), Some(100.0));
    }

    #[tokio::test]
    async fn reusing_a_job_id_is_rejected_without_clobbering_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(ScriptedEncoder::default());
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        let job_id = Uuid::new_v4();
        let targets = profiles(&[("720p", 1280, 720)]);
        TranscodeService::register(&state, job_id, &targets).unwrap();

        assert!(matches!(
            TranscodeService::register(&state, job_id, &targets),
            Err(JobError::DuplicateJob(_))
        ));
        assert!(state.jobs.get(job_id).is_some());
        assert_eq!(state.progress.overall(job_id), Some(0.0));
    }

    #[tokio::test]
    async fn an_empty_target_list_is_a_submission_error() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(ScriptedEncoder::default());
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        assert!(matches!(
            TranscodeService::register(&state, Uuid::new_v4(), &[]),
            Err(JobError::NoTargets)
        ));
    }

    #[tokio::test]
    async fn a_zero_area_target_is_a_submission_error() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(ScriptedEncoder::default());
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        let targets = profiles(&[("broken", 0, 720)]);
        assert!(matches!(
            TranscodeService::register(&state, Uuid::new_v4(), &targets),
            Err(JobError::InvalidTarget { .. })
        ));
    }

    #[tokio::test]
    async fn submit_applies_the_default_ladder_and_rejects_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let encoder = Arc::new(ScriptedEncoder::default());
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        let job_id = TranscodeService::submit(
            state.clone(),
            SubmitJobRequest {
                source_path: source.display().to_string(),
                targets: None,
                uploader: None,
            },
        )
        .await
        .unwrap();

        let record = state.jobs.get(job_id).unwrap();
        assert_eq!(record.targets.len(), TargetProfile::default_ladder().len());

        let missing = TranscodeService::submit(
            state,
            SubmitJobRequest {
                source_path: dir.path().join("missing.mp4").display().to_string(),
                targets: None,
                uploader: None,
            },
        )
        .await;
        assert!(matches!(missing, Err(JobError::SourceMissing(_))));
    }

    #[tokio::test]
    async fn progress_for_an_unknown_job_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(ScriptedEncoder::default());
        let sink = Arc::new(LocalDiskSink::new(dir.path().join("store")));
        let state = test_state(encoder, sink, dir.path());

        assert_eq!(state.progress.overall(Uuid::new_v4()), None);
        assert!(state.jobs.get(Uuid::new_v4()).is_none());
    }
}
