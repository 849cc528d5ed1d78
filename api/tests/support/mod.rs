#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use prometheus::Registry;
use serde_json::{json, Value};
use shared::{NewUser, User};
use tower::ServiceExt;
use uuid::Uuid;

use registration_api::config::ServerConfig;
use registration_api::hasher::BcryptHasher;
use registration_api::metrics;
use registration_api::repository::{RepositoryError, UserRepository};
use registration_api::service::{ConflictDisclosure, RegistrationService, RegistrationSettings};
use registration_api::state::{AppState, HealthTimeouts};
use registration_api::validation::{RunPolicy, ValidationChain};

/// In-memory account store with call counters
#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<Vec<User>>,
    creates: AtomicUsize,
    lookups: AtomicUsize,
    stalled: bool,
}

impl MemoryUsers {
    /// A store whose every call hangs, like an unreachable database
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::default()
        }
    }

    async fn stall(&self) {
        if self.stalled {
            std::future::pending::<()>().await;
        }
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        self.stall().await;
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().iter().any(|u| u.email == email))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        self.stall().await;
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().iter().any(|u| u.username == username))
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.stall().await;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: user.phone_number,
            street_address: user.street_address,
            city: user.city,
            state: user.state,
            country: user.country,
            username: user.username,
            password_hash: user.password_hash,
            accept_terms: user.accept_terms,
            newsletter: user.newsletter,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.users.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.stall().await;
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUsers>,
}

impl TestApp {
    pub fn new(policy: RunPolicy) -> Self {
        Self::with_chain(ValidationChain::registration(policy))
    }

    pub fn with_chain(chain: ValidationChain) -> Self {
        Self::with_parts(
            chain,
            MemoryUsers::default(),
            ServerConfig::default(),
            HealthTimeouts::default(),
        )
    }

    /// App over a store that never answers, with short limits everywhere
    pub fn unresponsive(limit: Duration) -> Self {
        Self::with_parts(
            ValidationChain::registration(RunPolicy::ShortCircuit),
            MemoryUsers::stalled(),
            ServerConfig {
                write_timeout: limit,
                ..ServerConfig::default()
            },
            HealthTimeouts {
                health: limit,
                readiness: limit,
            },
        )
    }

    pub fn with_parts(
        chain: ValidationChain,
        users: MemoryUsers,
        server: ServerConfig,
        health_limits: HealthTimeouts,
    ) -> Self {
        let users = Arc::new(users);
        let registrations = RegistrationService::new(
            users.clone(),
            Arc::new(BcryptHasher),
            RegistrationSettings {
                password_cost: 4,
                disclosure: ConflictDisclosure::Reveal,
            },
        );
        let registry = Registry::new();
        metrics::register_all(&registry).unwrap();

        let state = AppState::new(chain, registrations, registry).with_health_timeouts(health_limits);
        let router = registration_api::app(state, &server);
        Self { router, users }
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

pub fn registration(username: &str, email: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "phoneNumber": "555-123-4567",
        "streetAddress": "12 Analytical Row",
        "city": "London",
        "state": "Greater London",
        "country": "GB",
        "username": username,
        "password": "Engine1843!",
        "confirmPassword": "Engine1843!",
        "acceptTerms": true,
        "newsletter": true
    })
}

pub fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
