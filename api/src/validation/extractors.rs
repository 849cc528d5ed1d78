//! Field errors, the error accumulator and the registration extractor
//!
//! `ValidatedRegistration` is the gate in front of `POST /api/register`: it
//! reads the raw body, runs the shared validation chain over it and only
//! hands the typed request to the handler when every stage passed.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use shared::RegistrationRequest;
use uuid::Uuid;

use super::chain::RunPolicy;
use crate::{
    error::{json_with_correlation_id, ErrorCode},
    metrics,
    state::AppState,
};

/// A field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validation error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorResponse {
    pub code: &'static str,
    pub message: String,
    pub errors: Vec<FieldError>,
    pub timestamp: String,
    pub correlation_id: String,
}

impl ValidationErrorResponse {
    pub fn new(errors: Vec<FieldError>) -> Self {
        let message = match errors.as_slice() {
            [single] => format!("Validation failed for field '{}'", single.field),
            _ => format!("Validation failed for {} fields", errors.len()),
        };

        Self {
            code: ErrorCode::Validation.as_str(),
            message,
            errors,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Validation error that converts to an HTTP response
#[derive(Debug)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.errors.iter().map(|e| e.field.as_str()).collect();
        write!(f, "validation failed for [{}]", fields.join(", "))
    }
}

impl std::error::Error for ValidationError {}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let payload = ValidationErrorResponse::new(self.errors);
        let correlation_id = payload.correlation_id.clone();
        json_with_correlation_id(StatusCode::BAD_REQUEST, &payload, &correlation_id)
    }
}

/// Registration request that has passed the whole validation chain.
///
/// Extracting this type consumes the body, so it must be the last extractor
/// of a handler. On rejection the handler never runs.
#[derive(Debug)]
pub struct ValidatedRegistration(pub RegistrationRequest);

#[async_trait]
impl FromRequest<AppState> for ValidatedRegistration {
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|err| {
            tracing::debug!(error = %err, "failed to read registration body");
            ValidationError::single("body", "Failed to read request body")
        })?;

        match state.chain.gate(&body) {
            Ok(request) => Ok(ValidatedRegistration(request)),
            Err(err) => {
                tracing::debug!(
                    policy = %state.chain.policy(),
                    error_count = err.errors.len(),
                    "registration rejected by validation chain"
                );
                metrics::record_validation_failure(&err.errors);
                Err(err)
            }
        }
    }
}

/// Builder for accumulating validation errors.
///
/// A builder created with [`ValidationBuilder::for_policy`] under the
/// short-circuit policy keeps only the first error it is given.
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<FieldError>,
    first_only: bool,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_policy(policy: RunPolicy) -> Self {
        Self {
            errors: vec![],
            first_only: policy == RunPolicy::ShortCircuit,
        }
    }

    fn accepts_more(&self) -> bool {
        !(self.first_only && self.has_errors())
    }

    /// Add an error if the result is Err
    pub fn check<F>(&mut self, field: &str, validator: F) -> &mut Self
    where
        F: FnOnce() -> Result<(), String>,
    {
        if !self.accepts_more() {
            return self;
        }
        if let Err(message) = validator() {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Add an error directly
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        if self.accepts_more() {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Add error if condition is true
    pub fn check_condition(
        &mut self,
        condition: bool,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut Self {
        if condition {
            self.add_error(field, message);
        }
        self
    }

    /// Finish building and return Result
    pub fn build(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
