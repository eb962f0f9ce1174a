use crate::modules::transcode::model::TargetProfile;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod ffmpeg;

/// One progress report from an in-flight encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub percent: f32,
    pub fps: Option<f32>,
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("source {0} is not a readable file")]
    SourceUnreadable(String),
    #[error("failed to spawn {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not probe source duration: {0}")]
    Probe(String),
    #[error("encoder exited with status {status}: {detail}")]
    Failed { status: i32, detail: String },
    #[error("i/o error while encoding: {0}")]
    Io(#[from] std::io::Error),
}

/// One external-encoder run for one (source, output, profile) triple.
///
/// Progress events are sent on `progress` as the encoder reports them; the
/// terminal outcome is the return value (bytes written to `output`).
/// Percentages are passed through as reported, non-monotonic ones included;
/// the progress table clamps.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(
        &self,
        source: &Path,
        output: &Path,
        profile: &TargetProfile,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<u64, EncodeError>;
}
