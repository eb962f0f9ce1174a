use crate::config::env::{self, EnvKey};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl StorageBackend {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "s3" | "minio" => StorageBackend::S3,
            _ => StorageBackend::Local,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    /// Where in-flight encoder outputs live before the sink takes them.
    pub scratch_dir: PathBuf,
    pub storage_backend: StorageBackend,
    pub artifact_root: PathBuf,
    pub minio_url: Option<String>,
    pub minio_bucket: Option<String>,
    pub minio_access_key: Option<String>,
    pub minio_secret_key: Option<String>,
    pub database_url: Option<String>,
    /// How long a finished job stays pollable before the janitor drops it.
    pub job_retention_secs: u64,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            ffprobe_bin: env::get_or(EnvKey::FfprobeBin, "ffprobe"),
            scratch_dir: PathBuf::from(env::get_or(EnvKey::ScratchDir, "/tmp")),
            storage_backend: StorageBackend::parse(&env::get_or(EnvKey::StorageBackend, "local")),
            artifact_root: PathBuf::from(env::get_or(EnvKey::ArtifactRoot, "./artifacts")),
            minio_url: env::get(EnvKey::MinioUrl).ok(),
            minio_bucket: env::get(EnvKey::MinioBucket).ok(),
            minio_access_key: env::get(EnvKey::MinioAccessKey).ok(),
            minio_secret_key: env::get(EnvKey::MinioSecretKey).ok(),
            database_url: env::get(EnvKey::DatabaseUrl).ok(),
            job_retention_secs: env::get_parsed(EnvKey::JobRetentionSecs, 600),
        }
    }
}
