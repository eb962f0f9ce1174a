use crate::modules::transcode::dto::*;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::transcode::handler::submit_job,
        crate::modules::transcode::handler::job_progress,
        crate::modules::transcode::handler::job_result,
    ),
    components(
        schemas(
            SubmitJobRequest, TargetProfileRequest, JobSubmittedResponse,
            JobProgressResponse, JobStatusResponse,
            crate::modules::transcode::model::TargetProfile,
            crate::modules::transcode::model::TargetOutcome,
            crate::modules::transcode::model::TargetState,
            crate::modules::transcode::model::TargetFailure,
            crate::modules::transcode::model::FailureKind,
            crate::modules::transcode::model::JobStatus,
            crate::infrastructure::storage::ArtifactLocator,
        )
    ),
    tags(
        (name = "Transcode", description = "Video transcode job lifecycle")
    )
)]
pub struct ApiDoc;
