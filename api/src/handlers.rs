use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{AvailabilityResponse, RegistrationResponse};

use crate::{
    error::{ApiError, ApiResult},
    metrics,
    service::{Availability, RegistrationError},
    state::AppState,
    validation::ValidatedRegistration,
};

pub async fn register(
    State(state): State<AppState>,
    ValidatedRegistration(request): ValidatedRegistration,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    let username = request.username.clone();

    match state.registrations.register(request).await {
        Ok(user) => {
            metrics::record_registration("created");
            tracing::info!(user_id = %user.id, username = %user.username, "registration succeeded");
            Ok((StatusCode::CREATED, Json(RegistrationResponse::for_user(&user))))
        }
        Err(err) => {
            let outcome = match err {
                RegistrationError::Conflict { .. } => "conflict",
                _ => "error",
            };
            metrics::record_registration(outcome);
            tracing::warn!(username = %username, error = %err, "registration rejected");
            Err(ApiError::from(err))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: Option<String>,
}

fn availability_response(label: &str, value: &str, availability: Availability) -> AvailabilityResponse {
    let message = match availability {
        Availability::Available => format!("{} '{}' is available", label, value),
        Availability::Taken => format!("{} '{}' is already taken", label, value),
        Availability::Invalid if value.is_empty() => format!("{} is required", label),
        Availability::Invalid => format!("{} '{}' is not valid", label, value),
    };
    AvailabilityResponse {
        available: availability.is_available(),
        message,
    }
}

pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let username = query.username.unwrap_or_default();
    let availability = state.registrations.check_username(&username).await?;
    metrics::record_availability_check("username", availability.as_str());
    Ok(Json(availability_response("Username", &username, availability)))
}

pub async fn check_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let email = query.email.unwrap_or_default();
    let availability = state.registrations.check_email(&email).await?;
    metrics::record_availability_check("email", availability.as_str());
    Ok(Json(availability_response("Email", &email, availability)))
}

/// Pings the store, giving up after `limit`. Returns the round-trip latency.
async fn ping_store(state: &AppState, limit: Duration) -> Result<Duration, String> {
    let started = Instant::now();
    match tokio::time::timeout(limit, state.registrations.ping()).await {
        Ok(Ok(())) => Ok(started.elapsed()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("ping timed out after {}ms", limit.as_millis())),
    }
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime = state.started_at.elapsed().as_secs();
    let now = chrono::Utc::now().to_rfc3339();
    let pool = state.registrations.pool_stats();

    match ping_store(&state, state.health_limits.health).await {
        Ok(latency) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": now,
                "uptimeSecs": uptime,
                "services": {
                    "database": {
                        "status": "healthy",
                        "latencyMs": latency.as_millis() as u64,
                        "pool": pool
                    }
                }
            })),
        ),
        Err(error) => {
            tracing::warn!(uptime_secs = uptime, error = %error, "health check degraded, store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": now,
                    "uptimeSecs": uptime,
                    "services": {
                        "database": {
                            "status": "unhealthy",
                            "error": error,
                            "pool": pool
                        }
                    }
                })),
            )
        }
    }
}

/// Readiness: the account store answers within the readiness limit
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now().to_rfc3339();

    match ping_store(&state, state.health_limits.readiness).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "database": "ok", "timestamp": now })),
        ),
        Err(error) => {
            tracing::warn!(error = %error, "readiness check failed, database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not_ready", "database": "unreachable", "timestamp": now })),
            )
        }
    }
}

pub async fn route_not_found() -> impl IntoResponse {
    ApiError::not_found("Route not found")
}
