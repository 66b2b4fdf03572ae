use super::dto::{ComicProgress, StoryPrompt};
use super::service::ComicService;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tokio_util::io::ReaderStream;
use tracing::error;
use uuid::Uuid;
use validator::Validate;

/// Start comic generation
/// The job runs in the background; poll the status endpoint for progress.
#[utoipa::path(
    post,
    path = "/api/v1/comics/generate",
    request_body = StoryPrompt,
    responses(
        (status = 202, description = "Comic generation started", body = ApiResponse<ComicProgress>),
        (status = 422, description = "Invalid prompt"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Comics"
)]
pub async fn start_generation(
    State(state): State<AppState>,
    payload: Result<Json<StoryPrompt>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return ApiError(rejection.body_text(), StatusCode::UNPROCESSABLE_ENTITY).into_response();
        }
    };

    if let Err(e) = payload.validate() {
        return ApiError(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY).into_response();
    }

    match ComicService::start(state, payload).await {
        Ok(progress) => ApiSuccess(
            ApiResponse::success(progress, "Comic generation started"),
            StatusCode::ACCEPTED,
        )
        .into_response(),
        Err(e) => {
            error!("Error starting comic generation: {:#}", e);
            ApiError(
                format!("Failed to start comic generation: {}", e),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/comics/status/{job_id}",
    params(
        ("job_id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status", body = ApiResponse<ComicProgress>),
        (status = 404, description = "Job not found")
    ),
    tag = "Comics"
)]
pub async fn check_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let Ok(job_id) = Uuid::parse_str(&job_id) else {
        return ApiError::not_found(&format!("Job {} not found", job_id)).into_response();
    };

    match ComicService::status(state, job_id).await {
        Ok(progress) => ApiSuccess(
            ApiResponse::success(progress, "Job status retrieved"),
            StatusCode::OK,
        )
        .into_response(),
        Err(e) => ApiError::not_found(&e.to_string()).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/comics",
    responses(
        (status = 200, description = "All jobs, newest first", body = ApiResponse<Vec<ComicProgress>>)
    ),
    tag = "Comics"
)]
pub async fn list_comics(State(state): State<AppState>) -> impl IntoResponse {
    let jobs = ComicService::list(state).await;
    ApiSuccess(ApiResponse::success(jobs, "Jobs retrieved"), StatusCode::OK).into_response()
}

/// Serve a generated file
#[utoipa::path(
    get,
    path = "/api/v1/comics/files/{job_id}/{kind}/{filename}",
    params(
        ("job_id" = String, Path, description = "Job ID"),
        ("kind" = String, Path, description = "images, audio or output"),
        ("filename" = String, Path, description = "File name")
    ),
    responses(
        (status = 200, description = "File contents", body = Vec<u8>),
        (status = 404, description = "File not found")
    ),
    tag = "Comics"
)]
pub async fn serve_file(
    State(state): State<AppState>,
    Path((job_id, kind, filename)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let not_found = || ApiError::not_found("File not found").into_response();

    let Ok(job_id) = Uuid::parse_str(&job_id) else {
        return not_found();
    };

    let file_path = match state.storage.resolve(job_id, &kind, &filename).await {
        Some(p) => p,
        None => return not_found(),
    };

    let file = match tokio::fs::File::open(&file_path).await {
        Ok(f) => f,
        Err(e) => {
            error!("Error serving file {}: {}", file_path.display(), e);
            return not_found();
        }
    };

    let mut builder = axum::response::Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            mime_guess::from_path(&file_path).first_or_octet_stream().to_string(),
        );

    if let Ok(meta) = file.metadata().await {
        builder = builder.header(header::CONTENT_LENGTH, meta.len());
    }

    let body = Body::from_stream(ReaderStream::new(file));

    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use crate::infrastructure::storage::local::ArtifactKind;
    use crate::modules::comic::dto::StoryPrompt;
    use crate::modules::comic::model::ComicJob;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use bytes::Bytes;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;
    use wiremock::MockServer;

    async fn app(server: &MockServer, dir: &tempfile::TempDir) -> (Router, AppState) {
        let state = AppState::for_tests(&server.uri(), dir.path());
        (crate::app::create_app(state.clone()), state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn generate_accepts_and_registers_job() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app(&server, &dir).await;

        let response = app
            .oneshot(post_json("/api/v1/comics/generate", json!({ "prompt": "a sleepy dragon", "num_panels": 2 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["total_steps"], 6);

        let id: Uuid = json["data"]["id"].as_str().unwrap().parse().unwrap();
        assert!(state.jobs.get(id).await.is_some());
        assert!(state.storage.project_dir(id).join("images").is_dir());
    }

    #[tokio::test]
    async fn generate_rejects_invalid_prompt() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&server, &dir).await;

        let response = app
            .oneshot(post_json("/api/v1/comics/generate", json!({ "prompt": "fox", "num_panels": 50 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["status"], "error");
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&server, &dir).await;

        let response = app
            .oneshot(get(&format!("/api/v1/comics/status/{}", Uuid::new_v4())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn undecodable_body_gets_error_envelope() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&server, &dir).await;

        let response = app
            .oneshot(post_json("/api/v1/comics/generate", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert!(json["message"].as_str().unwrap().contains("prompt"));
    }

    #[tokio::test]
    async fn malformed_job_ids_are_not_found() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&server, &dir).await;

        let response = app.clone().oneshot(get("/api/v1/comics/status/not-a-job")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["status"], "error");

        let response = app
            .oneshot(get("/api/v1/comics/files/not-a-job/output/comic.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_jobs_newest_first() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app(&server, &dir).await;

        let prompt = |text: &str| -> StoryPrompt {
            serde_json::from_value(json!({ "prompt": text })).unwrap()
        };
        let mut older = ComicJob::new(prompt("an old lighthouse"));
        older.created_at -= time::Duration::minutes(10);
        let newer = ComicJob::new(prompt("a new moon"));
        let (older_id, newer_id) = (older.id.to_string(), newer.id.to_string());
        state.jobs.insert(older).await;
        state.jobs.insert(newer).await;

        let response = app.oneshot(get("/api/v1/comics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        let ids: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|job| job["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![newer_id.as_str(), older_id.as_str()]);
    }

    #[tokio::test]
    async fn serves_stored_files_and_blocks_traversal() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app(&server, &dir).await;

        let id = Uuid::new_v4();
        state.storage.create_project_dirs(id).await.unwrap();
        state
            .storage
            .write(id, ArtifactKind::Audio, "voiceover.mp3", Bytes::from_static(b"mp3 bytes"), "audio/mpeg")
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(get(&format!("/api/v1/comics/files/{}/audio/voiceover.mp3", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"mp3 bytes");

        let response = app
            .oneshot(get(&format!("/api/v1/comics/files/{}/audio/..%2F..%2Fvoiceover.mp3", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&server, &dir).await;

        let response = app.oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].is_string());
    }
}
