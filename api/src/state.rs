use prometheus::Registry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::service::RegistrationService;
use crate::validation::ValidationChain;

/// How long the health endpoints wait on the account store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTimeouts {
    pub health: Duration,
    pub readiness: Duration,
}

impl Default for HealthTimeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(5),
            readiness: Duration::from_secs(2),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; every request runs it with its own context
    pub chain: Arc<ValidationChain>,
    pub registrations: Arc<RegistrationService>,
    pub started_at: Instant,
    pub registry: Registry,
    pub health_limits: HealthTimeouts,
}

impl AppState {
    pub fn new(chain: ValidationChain, registrations: RegistrationService, registry: Registry) -> Self {
        Self {
            chain: Arc::new(chain),
            registrations: Arc::new(registrations),
            started_at: Instant::now(),
            registry,
            health_limits: HealthTimeouts::default(),
        }
    }

    pub fn with_health_timeouts(mut self, health_limits: HealthTimeouts) -> Self {
        self.health_limits = health_limits;
        self
    }
}
