use once_cell::sync::Lazy;
use prometheus::{
    opts, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder,
};

use crate::validation::FieldError;

macro_rules! counter_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| IntCounterVec::new(opts!($name, $help), $labels).unwrap())
    };
}
macro_rules! histogram_vec {
    ($name:expr, $help:expr, $labels:expr, $buckets:expr) => {
        Lazy::new(|| {
            HistogramVec::new(HistogramOpts::new($name, $help).buckets($buckets.to_vec()), $labels)
                .unwrap()
        })
    };
}
macro_rules! gauge {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntGauge::new($name, $help).unwrap())
    };
}

const LATENCY_BUCKETS: [f64; 14] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// bcrypt runs from a few ms at cost 4 to seconds at high costs
const HASH_BUCKETS: [f64; 10] = [0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0];

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("http_requests_total", "Total HTTP requests", &["method", "path", "status"]);
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = histogram_vec!(
    "http_request_duration_seconds",
    "HTTP request latency",
    &["method", "path"],
    LATENCY_BUCKETS
);
pub static HTTP_IN_FLIGHT: Lazy<IntGauge> = gauge!("http_requests_in_flight", "In-flight HTTP requests");

// ── Registration ────────────────────────────────────────────────────────────
pub static REGISTRATIONS_TOTAL: Lazy<IntCounterVec> = counter_vec!(
    "registrations_total",
    "Registration attempts by outcome",
    &["outcome"]
);
pub static VALIDATION_FAILURES: Lazy<IntCounterVec> = counter_vec!(
    "validation_failures_total",
    "Validation errors reported per field",
    &["field"]
);
pub static AVAILABILITY_CHECKS: Lazy<IntCounterVec> = counter_vec!(
    "availability_checks_total",
    "Username and email availability lookups",
    &["kind", "result"]
);

// ── Credentials ─────────────────────────────────────────────────────────────
pub static PASSWORD_HASH_DURATION: Lazy<HistogramVec> = histogram_vec!(
    "password_hash_duration_seconds",
    "Time spent hashing passwords",
    &["cost"],
    HASH_BUCKETS
);

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(HTTP_IN_FLIGHT.clone()))?;
    r.register(Box::new(REGISTRATIONS_TOTAL.clone()))?;
    r.register(Box::new(VALIDATION_FAILURES.clone()))?;
    r.register(Box::new(AVAILABILITY_CHECKS.clone()))?;
    r.register(Box::new(PASSWORD_HASH_DURATION.clone()))?;
    Ok(())
}

pub fn gather_metrics(r: &Registry) -> String {
    let encoder = TextEncoder::new();
    let families = r.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).unwrap_or_default();
    String::from_utf8(buf).unwrap_or_default()
}

pub fn observe_http(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// `outcome` is one of created, invalid, conflict or error
pub fn record_registration(outcome: &str) {
    REGISTRATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_validation_failure(errors: &[FieldError]) {
    record_registration("invalid");
    for error in errors {
        VALIDATION_FAILURES
            .with_label_values(&[error.field.as_str()])
            .inc();
    }
}

pub fn record_availability_check(kind: &str, result: &str) {
    AVAILABILITY_CHECKS.with_label_values(&[kind, result]).inc();
}

pub fn observe_password_hash(cost: u32, duration_secs: f64) {
    PASSWORD_HASH_DURATION
        .with_label_values(&[&cost.to_string()])
        .observe(duration_secs);
}
