//! Runtime configuration
//!
//! Everything comes from environment variables (optionally seeded from a
//! `.env` file). Every key has a default, so an empty environment yields a
//! configuration that talks to a local Postgres.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;
use tracing::info;

use crate::hasher::{DEFAULT_COST, MAX_COST, MIN_COST};
use crate::service::{ConflictDisclosure, RegistrationSettings};
use crate::validation::RunPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection, including connecting
    pub connect_timeout: Duration,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_allowed_origin: HeaderValue,
    pub shutdown_grace: Duration,
    /// Limit on receiving the request body
    pub read_timeout: Duration,
    /// Limit on producing the response
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_allowed_origin: HeaderValue::from_static("http://localhost:5173"),
            shutdown_grace: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub registration: RegistrationSettings,
    pub validation_policy: RunPolicy,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let url = match lookup("DATABASE_URL") {
            Some(url) if !url.trim().is_empty() => url,
            _ => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                get("DB_USER", "postgres"),
                get("DB_PASSWORD", "postgres"),
                get("DB_HOST", "localhost"),
                get("DB_PORT", "5432"),
                get("DB_NAME", "registration_db"),
                get("DB_SSLMODE", "disable"),
            ),
        };
        let max_connections = parse_in_range(
            "DB_MAX_CONNECTIONS",
            &get("DB_MAX_CONNECTIONS", "10"),
            1,
            1000,
        )? as u32;
        let connect_timeout = secs("DB_CONNECT_TIMEOUT_SECS", &get("DB_CONNECT_TIMEOUT_SECS", "5"), 1, 300)?;
        let max_lifetime = secs("DB_MAX_LIFETIME_SECS", &get("DB_MAX_LIFETIME_SECS", "3600"), 1, 86_400)?;
        let idle_timeout = secs("DB_IDLE_TIMEOUT_SECS", &get("DB_IDLE_TIMEOUT_SECS", "1800"), 1, 86_400)?;

        let port = parse_in_range("PORT", &get("PORT", "8080"), 1, u16::MAX as u64)? as u16;

        let origin = get("CORS_ALLOWED_ORIGIN", "http://localhost:5173");
        if origin.trim() == "*" {
            return Err(ConfigError::InvalidValue {
                key: "CORS_ALLOWED_ORIGIN",
                value: origin,
                reason: "a wildcard origin cannot be combined with credentials".to_string(),
            });
        }
        let cors_allowed_origin =
            HeaderValue::from_str(&origin).map_err(|e| ConfigError::InvalidValue {
                key: "CORS_ALLOWED_ORIGIN",
                value: origin.clone(),
                reason: e.to_string(),
            })?;

        let shutdown_grace = secs("SHUTDOWN_GRACE_SECS", &get("SHUTDOWN_GRACE_SECS", "5"), 0, 300)?;
        let read_timeout = secs("READ_TIMEOUT", &get("READ_TIMEOUT", "10"), 1, 3600)?;
        let write_timeout = secs("WRITE_TIMEOUT", &get("WRITE_TIMEOUT", "30"), 1, 3600)?;

        let password_cost = parse_in_range(
            "PASSWORD_COST",
            &get("PASSWORD_COST", &DEFAULT_COST.to_string()),
            MIN_COST as u64,
            MAX_COST as u64,
        )? as u32;

        let disclosure: ConflictDisclosure =
            parse_with("REVEAL_CONFLICT_FIELD", &get("REVEAL_CONFLICT_FIELD", "true"))?;
        let validation_policy: RunPolicy =
            parse_with("VALIDATION_POLICY", &get("VALIDATION_POLICY", "short-circuit"))?;

        info!(
            "Configuration loaded: port={}, max_connections={}, password_cost={}, validation_policy={}, cors_origin={}, read_timeout={:?}, write_timeout={:?}",
            port, max_connections, password_cost, validation_policy, origin, read_timeout, write_timeout
        );

        Ok(AppConfig {
            database: DatabaseConfig {
                url,
                max_connections,
                connect_timeout,
                max_lifetime,
                idle_timeout,
            },
            server: ServerConfig {
                port,
                cors_allowed_origin,
                shutdown_grace,
                read_timeout,
                write_timeout,
            },
            registration: RegistrationSettings {
                password_cost,
                disclosure,
            },
            validation_policy,
        })
    }
}

fn parse_in_range(key: &'static str, raw: &str, min: u64, max: u64) -> Result<u64, ConfigError> {
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

fn secs(key: &'static str, raw: &str, min: u64, max: u64) -> Result<Duration, ConfigError> {
    parse_in_range(key, raw, min, max).map(Duration::from_secs)
}

fn parse_with<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|reason| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason,
    })
}
