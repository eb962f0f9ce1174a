use crate::infrastructure::storage::ArtifactLocator;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One desired output rendition for a source video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TargetProfile {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl TargetProfile {
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
        }
    }

    /// The rendition ladder applied when a submission does not name its own.
    pub fn default_ladder() -> Vec<TargetProfile> {
        vec![
            TargetProfile::new("1080p", 1920, 1080),
            TargetProfile::new("720p", 1280, 720),
            TargetProfile::new("480p", 854, 480),
            TargetProfile::new("360p", 640, 360),
            TargetProfile::new("240p", 426, 240),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetState {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    PartiallyFailed,
    Failed,
}

/// Which half of the pipeline a target died in, kept apart so a storage
/// outage is never mistaken for a codec problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Encode,
    Store,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TargetFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TargetOutcome {
    pub profile: TargetProfile,
    pub state: TargetState,
    /// Last known completion percentage; exactly 100 once `Done`.
    pub progress: f32,
    pub artifact: Option<ArtifactLocator>,
    pub error: Option<TargetFailure>,
}

impl TargetOutcome {
    pub fn pending(profile: TargetProfile) -> Self {
        Self {
            profile,
            state: TargetState::Pending,
            progress: 0.0,
            artifact: None,
            error: None,
        }
    }

    pub fn done(profile: TargetProfile, artifact: ArtifactLocator) -> Self {
        Self {
            profile,
            state: TargetState::Done,
            progress: 100.0,
            artifact: Some(artifact),
            error: None,
        }
    }

    pub fn failed(profile: TargetProfile, progress: f32, failure: TargetFailure) -> Self {
        Self {
            profile,
            state: TargetState::Failed,
            progress,
            artifact: None,
            error: Some(failure),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub targets: Vec<TargetOutcome>,
}

impl JobResult {
    /// All `Done` → `Succeeded`; all `Failed` → `Failed`; any mix →
    /// `PartiallyFailed`. Only called once every target is terminal.
    pub fn resolve_status(targets: &[TargetOutcome]) -> JobStatus {
        let done = targets
            .iter()
            .filter(|t| t.state == TargetState::Done)
            .count();
        if done == targets.len() {
            JobStatus::Succeeded
        } else if done == 0 {
            JobStatus::Failed
        } else {
            JobStatus::PartiallyFailed
        }
    }
}
