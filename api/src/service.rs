//! Registration orchestration
//!
//! Runs after the validation chain has accepted a request: uniqueness checks,
//! password hashing and the insert. Also answers the availability lookups.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use shared::{NewUser, RegistrationRequest, UniqueField, User};
use thiserror::Error;

use crate::hasher::{HashError, PasswordHasher, DEFAULT_COST};
use crate::metrics;
use crate::repository::{PoolStats, RepositoryError, UserRepository};
use crate::validation::validators::{validate_email, validate_username};

/// Whether a conflict response names the field that collided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictDisclosure {
    #[default]
    Reveal,
    Conceal,
}

impl FromStr for ConflictDisclosure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "reveal" => Ok(ConflictDisclosure::Reveal),
            "false" | "0" | "no" | "conceal" => Ok(ConflictDisclosure::Conceal),
            other => Err(format!("expected true or false, got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegistrationSettings {
    pub password_cost: u32,
    pub disclosure: ConflictDisclosure,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            password_cost: DEFAULT_COST,
            disclosure: ConflictDisclosure::Reveal,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{}", conflict_display(.field))]
    Conflict { field: Option<UniqueField> },

    #[error("store failure during {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl RegistrationError {
    pub fn conflict_message(field: Option<UniqueField>) -> &'static str {
        match field {
            Some(UniqueField::Email) => "Email already registered",
            Some(UniqueField::Username) => "Username already taken",
            None => "An account with these details already exists",
        }
    }

    fn store(operation: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| RegistrationError::Store { operation, source }
    }
}

fn conflict_display(field: &Option<UniqueField>) -> &'static str {
    RegistrationError::conflict_message(*field)
}

/// Answer to an availability lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Taken,
    /// Malformed input; the store was not consulted
    Invalid,
}

impl Availability {
    pub fn is_available(self) -> bool {
        self == Availability::Available
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Taken => "taken",
            Availability::Invalid => "invalid",
        }
    }
}

pub struct RegistrationService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    settings: RegistrationSettings,
}

impl RegistrationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            users,
            hasher,
            settings,
        }
    }

    fn disclose(&self, field: UniqueField) -> Option<UniqueField> {
        match self.settings.disclosure {
            ConflictDisclosure::Reveal => Some(field),
            ConflictDisclosure::Conceal => None,
        }
    }

    /// Creates the account for an already validated request.
    ///
    /// Email is checked before username. The plaintext password is dropped
    /// once hashed and never reaches the store.
    pub async fn register(&self, request: RegistrationRequest) -> Result<User, RegistrationError> {
        let email_taken = self
            .users
            .exists_by_email(&request.email)
            .await
            .map_err(RegistrationError::store("exists_by_email"))?;
        if email_taken && self.settings.disclosure == ConflictDisclosure::Reveal {
            return Err(RegistrationError::Conflict {
                field: Some(UniqueField::Email),
            });
        }

        let username_taken = self
            .users
            .exists_by_username(&request.username)
            .await
            .map_err(RegistrationError::store("exists_by_username"))?;
        if email_taken || username_taken {
            let field = if email_taken {
                UniqueField::Email
            } else {
                UniqueField::Username
            };
            return Err(RegistrationError::Conflict {
                field: self.disclose(field),
            });
        }

        let hash = self.hash_password(request.password.clone()).await?;
        let record = NewUser::from_request(request, hash);

        match self.users.create(record).await {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent registration for the same identity.
            Err(RepositoryError::UniqueViolation { field }) => Err(RegistrationError::Conflict {
                field: field.and_then(|f| self.disclose(f)),
            }),
            Err(err) => Err(RegistrationError::store("create")(err)),
        }
    }

    async fn hash_password(&self, password: String) -> Result<Vec<u8>, RegistrationError> {
        let hasher = Arc::clone(&self.hasher);
        let cost = self.settings.password_cost;
        let started = Instant::now();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password, cost))
            .await
            .map_err(|err| HashError::Task(err.to_string()))??;

        metrics::observe_password_hash(cost, started.elapsed().as_secs_f64());
        Ok(hash.into_bytes())
    }

    pub async fn check_username(&self, username: &str) -> Result<Availability, RegistrationError> {
        if validate_username(username).is_err() {
            return Ok(Availability::Invalid);
        }
        let taken = self
            .users
            .exists_by_username(username)
            .await
            .map_err(RegistrationError::store("exists_by_username"))?;
        Ok(if taken {
            Availability::Taken
        } else {
            Availability::Available
        })
    }

    pub async fn check_email(&self, email: &str) -> Result<Availability, RegistrationError> {
        if validate_email(email).is_err() {
            return Ok(Availability::Invalid);
        }
        let taken = self
            .users
            .exists_by_email(email)
            .await
            .map_err(RegistrationError::store("exists_by_email"))?;
        Ok(if taken {
            Availability::Taken
        } else {
            Availability::Available
        })
    }

    /// Readiness of the backing store
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.users.ping().await
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.users.pool_stats()
    }
}
