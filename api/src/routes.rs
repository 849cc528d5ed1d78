use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, metrics_handler, state::AppState};

pub fn observability_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler::metrics_endpoint))
}

pub fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(handlers::register))
        .route("/api/check-username", get(handlers::check_username))
        .route("/api/check-email", get(handlers::check_email))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
}
