use super::{ArtifactLocator, ArtifactSink, StoreError};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::info;

/// Uploads artifacts to an S3-compatible object store.
#[derive(Clone)]
pub struct S3Sink {
    client: Client,
    bucket: String,
}

impl S3Sink {
    pub async fn new(endpoint: &str, bucket: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3 (MinIO)");

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ArtifactSink for S3Sink {
    async fn store(&self, artifact: &Path, key: &str) -> Result<ArtifactLocator, StoreError> {
        let data = tokio::fs::read(artifact)
            .await
            .map_err(|e| StoreError::Write {
                path: artifact.display().to_string(),
                source: e,
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type("video/mp4")
            .send()
            .await
            .map_err(|e| StoreError::Upload {
                key: key.to_string(),
                detail: e.to_string(),
            })?;

        Ok(ArtifactLocator(format!("{}/{}", self.bucket, key)))
    }
}
