use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LectorError {
    #[error("{0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Decode(String),

    #[error("Server error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Internal(String),
}

impl IntoResponse for LectorError {
    fn into_response(self) -> Response {
        let status = match &self {
            LectorError::Validation(_) => StatusCode::BAD_REQUEST,
            LectorError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LectorError::Ocr(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LectorError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LectorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LectorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.to_string();

        // 4xx responses are the caller's fault and are not server faults.
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        }

        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, LectorError>;
