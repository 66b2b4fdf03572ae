use axum::Router;
use axum::routing::{get, post};
use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_comics))
        .route("/generate", post(handler::start_generation))
        .route("/status/{job_id}", get(handler::check_status))
        .route("/files/{job_id}/{kind}/{filename}", get(handler::serve_file))
}
