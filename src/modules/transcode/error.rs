use super::model::{FailureKind, TargetFailure};
use crate::infrastructure::encoder::EncodeError;
use crate::infrastructure::storage::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Per-target failure. Captured into that target's outcome, never thrown
/// past the job.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

impl TargetError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TargetError::Encode(_) => FailureKind::Encode,
            TargetError::Store(_) => FailureKind::Store,
        }
    }
}

impl From<&TargetError> for TargetFailure {
    fn from(err: &TargetError) -> Self {
        TargetFailure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Submission-time and bookkeeping errors. These are the only conditions
/// that propagate to the caller; everything downstream resolves into the
/// per-target outcomes.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} is already tracked")]
    DuplicateJob(Uuid),
    #[error("job {0} is not tracked")]
    UnknownJob(Uuid),
    #[error("a job needs at least one target")]
    NoTargets,
    #[error("target {label} has a zero-area resolution")]
    InvalidTarget { label: String },
    #[error("source {0} is not a readable file")]
    SourceMissing(String),
}
