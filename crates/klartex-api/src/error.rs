//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Pipeline failures are mapped by their [`ErrorKind`]: request-caused
//! kinds become 400 or 422 with the kind as the error code, toolchain kinds
//! become a generic 500 whose details are only logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use klartex_core::{Classify, ErrorKind};
use klartex_render::RenderError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code, e.g. `UNKNOWN_TEMPLATE` or `BAD_REQUEST`.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Schema violations, present only for `SCHEMA_VIOLATION`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request body could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// A render or validation failure reported by the pipeline.
    #[error("{message}")]
    Pipeline {
        kind: ErrorKind,
        message: String,
        details: Option<serde_json::Value>,
    },
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Pipeline { kind, .. } => {
                let status = match kind {
                    ErrorKind::SchemaViolation | ErrorKind::MissingField => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    kind if kind.is_client_error() => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, kind.as_str())
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, Self::Pipeline { kind, .. } if !kind.is_client_error())
    }

    /// A lookup failure becomes 404; anything else keeps its pipeline mapping.
    pub fn lookup(err: RenderError) -> Self {
        if err.kind().is_client_error() {
            Self::NotFound(err.to_string())
        } else {
            err.into()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = if self.is_internal() {
            tracing::error!(error = %self, code, "render failed");
            ("An internal error occurred".to_string(), None)
        } else {
            let details = match &self {
                Self::Pipeline { details, .. } => details.clone(),
                _ => None,
            };
            (self.to_string(), details)
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        let details = err
            .violations()
            .and_then(|v| serde_json::to_value(v).ok());
        let mut message = err.to_string();
        if let Some(tail) = err.diagnostic_tail() {
            if !message.contains(tail) {
                message = format!("{message}\n{tail}");
            }
        }
        Self::Pipeline {
            kind: err.kind(),
            message,
            details,
        }
    }
}
