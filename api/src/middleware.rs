use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use crate::metrics;

/// Logs every request and feeds the HTTP metrics.
///
/// The route template is used as the path label so ids and query strings do
/// not blow up label cardinality.
pub async fn request_logger(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    metrics::HTTP_IN_FLIGHT.inc();
    let response = next.run(req).await;
    metrics::HTTP_IN_FLIGHT.dec();

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::observe_http(method.as_str(), &path, status, elapsed.as_secs_f64());

    let elapsed_ms = elapsed.as_millis();
    tracing::info!("{method} {uri} {status} {elapsed_ms}ms");

    response
}
