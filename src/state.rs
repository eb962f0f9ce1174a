use crate::config::settings::{AppConfig, StorageBackend};
use crate::infrastructure::db::pool::{self, DbPool};
use crate::infrastructure::encoder::{Encoder, ffmpeg::FfmpegEncoder};
use crate::infrastructure::storage::{ArtifactSink, local::LocalDiskSink, s3::S3Sink};
use crate::modules::transcode::progress::ProgressTable;
use crate::modules::transcode::registry::JobRegistry;
use anyhow::{Result, anyhow};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub progress: ProgressTable,
    pub jobs: JobRegistry,
    pub encoder: Arc<dyn Encoder>,
    pub sink: Arc<dyn ArtifactSink>,
    pub db: Option<DbPool>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        progress: ProgressTable,
        jobs: JobRegistry,
        encoder: Arc<dyn Encoder>,
        sink: Arc<dyn ArtifactSink>,
        db: Option<DbPool>,
    ) -> Self {
        Self {
            config,
            progress,
            jobs,
            encoder,
            sink,
            db,
        }
    }

    /// Wire the deployment's collaborators from configuration.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let encoder: Arc<dyn Encoder> = Arc::new(FfmpegEncoder::new(
            config.ffmpeg_bin.clone(),
            config.ffprobe_bin.clone(),
        ));

        let sink: Arc<dyn ArtifactSink> = match config.storage_backend {
            StorageBackend::Local => Arc::new(LocalDiskSink::new(config.artifact_root.clone())),
            StorageBackend::S3 => {
                let endpoint = config
                    .minio_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("MINIO_ENDPOINT is required for the s3 backend"))?;
                let bucket = config
                    .minio_bucket
                    .as_deref()
                    .ok_or_else(|| anyhow!("MINIO_BUCKET_VIDEOS is required for the s3 backend"))?;
                let access_key = config
                    .minio_access_key
                    .as_deref()
                    .ok_or_else(|| anyhow!("AWS_ACCESS_KEY_ID is required for the s3 backend"))?;
                let secret_key = config.minio_secret_key.as_deref().ok_or_else(|| {
                    anyhow!("AWS_SECRET_ACCESS_KEY is required for the s3 backend")
                })?;
                Arc::new(S3Sink::new(endpoint, bucket, access_key, secret_key).await)
            }
        };

        let db = match &config.database_url {
            Some(url) => Some(pool::connect_to_db(url).await?),
            None => None,
        };

        Ok(Self::new(
            config,
            ProgressTable::new(),
            JobRegistry::new(),
            encoder,
            sink,
            db,
        ))
    }
}
