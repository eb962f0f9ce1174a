use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::modules::transcode::dto::{
    JobProgressResponse, JobStatusResponse, JobSubmittedResponse, SubmitJobRequest,
};
use crate::modules::transcode::error::JobError;
use crate::modules::transcode::model::TargetState;
use crate::modules::transcode::service::TranscodeService;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

fn job_error_status(err: &JobError) -> StatusCode {
    match err {
        JobError::DuplicateJob(_) => StatusCode::CONFLICT,
        JobError::UnknownJob(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 202, description = "Job Accepted", body = ApiResponse<JobSubmittedResponse>),
        (status = 400, description = "Bad Request"),
        (status = 409, description = "Duplicate Job")
    ),
    tag = "Transcode"
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(req): Json<SubmitJobRequest>,
) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return ApiError(e.to_string(), StatusCode::BAD_REQUEST).into_response();
    }

    match TranscodeService::submit(state, req).await {
        Ok(job_id) => ApiSuccess(
            ApiResponse::success(JobSubmittedResponse { job_id }, "Job accepted"),
            StatusCode::ACCEPTED,
        )
        .into_response(),
        Err(e) => ApiError(e.to_string(), job_error_status(&e)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/progress",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job Progress", body = ApiResponse<JobProgressResponse>),
        (status = 404, description = "Job Unknown or Expired")
    ),
    tag = "Transcode"
)]
pub async fn job_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.progress.overall(id) {
        Some(percent) => ApiSuccess(
            ApiResponse::success(
                JobProgressResponse { job_id: id, percent },
                "Progress retrieved",
            ),
            StatusCode::OK,
        )
        .into_response(),
        None => {
            ApiError(JobError::UnknownJob(id).to_string(), StatusCode::NOT_FOUND).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job State", body = ApiResponse<JobStatusResponse>),
        (status = 404, description = "Job Unknown or Expired")
    ),
    tag = "Transcode"
)]
pub async fn job_result(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.jobs.get(id) {
        Some(record) => {
            let mut targets = record.targets;

            // Fold live percentages into targets that are still running.
            if let Some(row) = state.progress.snapshot(id) {
                for (target, percent) in targets.iter_mut().zip(row) {
                    if target.state == TargetState::Running {
                        target.progress = percent;
                    }
                }
            }

            ApiSuccess(
                ApiResponse::success(
                    JobStatusResponse {
                        job_id: id,
                        status: record.status,
                        targets,
                    },
                    "Job retrieved",
                ),
                StatusCode::OK,
            )
            .into_response()
        }
        None => {
            ApiError(JobError::UnknownJob(id).to_string(), StatusCode::NOT_FOUND).into_response()
        }
    }
}
