use super::model::{JobStatus, TargetOutcome, TargetProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitJobRequest {
    /// Path to a fully received source file, durable before submission.
    #[validate(length(min = 1, message = "Source path is required"))]
    pub source_path: String,
    /// Output renditions; omit to get the default ladder.
    #[validate(length(min = 1, message = "At least one target is required"))]
    pub targets: Option<Vec<TargetProfileRequest>>,
    /// Recorded with each artifact's metadata when a database is configured.
    pub uploader: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TargetProfileRequest {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl From<TargetProfileRequest> for TargetProfile {
    fn from(req: TargetProfileRequest) -> Self {
        TargetProfile::new(req.label, req.width, req.height)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobSubmittedResponse {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobProgressResponse {
    pub job_id: Uuid,
    pub percent: f32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub targets: Vec<TargetOutcome>,
}
