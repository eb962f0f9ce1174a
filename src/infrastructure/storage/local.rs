use super::{ArtifactLocator, ArtifactSink, StoreError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes artifacts under a root directory on the local filesystem.
#[derive(Clone)]
pub struct LocalDiskSink {
    root: PathBuf,
}

impl LocalDiskSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactSink for LocalDiskSink {
    async fn store(&self, artifact: &Path, key: &str) -> Result<ArtifactLocator, StoreError> {
        let dest = self.root.join(key);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Write {
                    path: parent.display().to_string(),
                    source: e,
                })?;
        }

        tokio::fs::copy(artifact, &dest)
            .await
            .map_err(|e| StoreError::Write {
                path: dest.display().to_string(),
                source: e,
            })?;

        debug!("Stored artifact at {}", dest.display());
        Ok(ArtifactLocator(dest.display().to_string()))
    }
}
