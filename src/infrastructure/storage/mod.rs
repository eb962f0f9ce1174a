use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use utoipa::ToSchema;

pub mod local;
pub mod s3;

/// Where a finished artifact ended up: a filesystem path for the local sink,
/// `bucket/key` for the object-store sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArtifactLocator(pub String);

impl ArtifactLocator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write artifact under {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to upload artifact {key}: {detail}")]
    Upload { key: String, detail: String },
}

/// Persists one finished target's bytes under a destination key.
///
/// Implementations must be idempotent under retry of the same
/// (artifact, key) pair: re-storing overwrites, it never duplicates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn store(&self, artifact: &Path, key: &str) -> Result<ArtifactLocator, StoreError>;
}
