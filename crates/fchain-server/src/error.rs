use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fchain_ingest::{ErrorKind, IngestError};
use thiserror::Error;

/// Errors from starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Request-level error rendered as
/// `{"error": {"code", "kind", "message"}}`, plus `"block"` when a block
/// was appended but could not be saved.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ingest(e) => match e.kind() {
                ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
                ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest.as_str(),
            Self::NotFound(_) => "not_found",
            Self::Ingest(e) => e.kind().as_str(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let mut error = serde_json::json!({
            "code": status.as_u16(),
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Ingest(e) = &self {
            if let Some(block) = e.unsaved_block() {
                error["block"] = serde_json::to_value(block).unwrap_or_default();
            }
        }
        (status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}
