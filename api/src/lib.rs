pub mod config;
pub mod error;
pub mod handlers;
pub mod hasher;
pub mod metrics;
pub mod metrics_handler;
pub mod middleware;
pub mod observability;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Browser access is limited to a single origin with credentials allowed
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

/// Builds the full application router.
///
/// Panics inside handlers or validators are turned into a 500 response by the
/// innermost layer, so the request logger still records them and the server
/// keeps serving. Requests that outlive the write timeout get a 408.
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(routes::registration_routes())
        .merge(routes::health_routes())
        .merge(routes::observability_routes())
        .fallback(handlers::route_not_found)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TimeoutLayer::new(server.write_timeout))
        .layer(RequestBodyTimeoutLayer::new(server.read_timeout))
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(server.cors_allowed_origin.clone()))
        .with_state(state)
}
