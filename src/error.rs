//! Error handling

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::logic::pipeline::PipelineError;
use crate::logic::reconcile::ReconcileError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Request errors
    ValidationError(String),
    PayloadTooLarge,

    // Per-request pipeline failures
    Pipeline(PipelineError),

    // Generic errors
    InternalError(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Pipeline(err) => match err.kind() {
                "no_file" | "unspecified_upload_error" => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::ValidationError(msg) => json!({
                "error": msg,
                "kind": "invalid_request",
                "status": status.as_u16()
            }),
            AppError::PayloadTooLarge => json!({
                "error": "Uploaded file is too large",
                "kind": "payload_too_large",
                "status": status.as_u16()
            }),
            AppError::Pipeline(err) => {
                tracing::warn!(kind = err.kind(), stage = ?err.stage(), "Request failed: {}", err);
                let mut body = json!({
                    "error": err.to_string(),
                    "kind": err.kind(),
                    "stage": err.stage(),
                    "status": status.as_u16()
                });
                if let PipelineError::Reconcile(ReconcileError::FeatureCountMismatch {
                    expected,
                    actual,
                }) = err
                {
                    body["expected"] = json!(expected);
                    body["actual"] = json!(actual);
                }
                body
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({
                    "error": "Internal server error",
                    "kind": "internal",
                    "status": status.as_u16()
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::ValidationError(err.body_text())
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}
