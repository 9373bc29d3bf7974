use assistant_relay::{AssistantRelay, FileUpload, RelayError, Submission};
use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tracing::{debug, error, info, warn};

/// Path of the submission endpoint.
pub const ASSISTANT_PATH: &str = "/api/assistant";

#[derive(Clone)]
struct AppState {
    relay: AssistantRelay,
}

/// Builds the HTTP router around `relay`.
pub fn router(relay: AssistantRelay, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(ASSISTANT_PATH, post(submit))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(AppState { relay })
}

async fn submit(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ApiError> {
    let submission = read_submission(multipart).await?;
    let frames = state.relay.submit(submission).await?;
    info!(
        thread_id = %frames.thread_id(),
        message_id = %frames.message_id(),
        run_id = %frames.run_id(),
        "streaming relay response"
    );

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Body::from_stream(frames.into_byte_stream())).into_response())
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut message = String::new();
    let mut thread_id = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => message = field.text().await?,
            "threadId" => thread_id = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                debug!(file_name = %file_name, size = bytes.len(), "received attachment");
                file = Some(FileUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            other => debug!(field = %other, "ignoring unknown form field"),
        }
    }

    let mut submission = Submission::new(message);
    if let Some(thread_id) = thread_id {
        submission = submission.thread_id(thread_id);
    }
    if let Some(file) = file {
        submission = submission.file(file);
    }
    Ok(submission)
}

/// Failures that happen before the frame stream starts.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid form data: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Multipart(_) | ApiError::Relay(RelayError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Relay(RelayError::Service(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "submission failed");
        } else {
            warn!(status = %status, error = %self, "submission rejected");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
