use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};

pub mod dto;
pub mod error;
pub mod handler;
pub mod model;
pub mod progress;
pub mod registry;
pub mod repository;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handler::submit_job))
        .route("/{id}", get(handler::job_result))
        .route("/{id}/progress", get(handler::job_progress))
}
