use std::any::Any;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use shared::UniqueField;
use uuid::Uuid;

use crate::service::RegistrationError;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Machine-readable error category carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    Duplicate,
    NotFound,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Duplicate => "DUPLICATE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: ErrorCode,
    message: String,
    field: Option<UniqueField>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<UniqueField>,
    timestamp: String,
    correlation_id: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>, field: Option<UniqueField>) -> Self {
        Self {
            field,
            ..Self::new(StatusCode::CONFLICT, ErrorCode::Duplicate, message)
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal, message)
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Conflict { field } => {
                ApiError::conflict(RegistrationError::conflict_message(field), field)
            }
            other => {
                tracing::error!(error = %other, "registration failed");
                ApiError::internal("An unexpected error occurred")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        let payload = ErrorResponse {
            code: self.code.as_str(),
            message: self.message,
            field: self.field,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: correlation_id.clone(),
        };

        json_with_correlation_id(self.status, &payload, &correlation_id)
    }
}

/// Serializes `payload` and tags the response with the correlation id header
pub(crate) fn json_with_correlation_id<T: Serialize>(
    status: StatusCode,
    payload: &T,
    correlation_id: &str,
) -> Response {
    let mut response = (status, Json(payload)).into_response();
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static(CORRELATION_ID_HEADER), value);
    }
    response
}

/// Turns a panic caught by the catch-panic layer into the generic 500 body.
///
/// The panic payload is logged but never returned to the client.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");

    ApiError::internal("An unexpected error occurred").into_response()
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
