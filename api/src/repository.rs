//! Account persistence
//!
//! The registration service talks to storage only through [`UserRepository`],
//! so tests can run against an in-memory store while production uses Postgres.

use async_trait::async_trait;
use serde::Serialize;
use shared::{NewUser, UniqueField, User};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the insert. `field` is `None` when the
    /// violated constraint is not one we know about.
    #[error("unique constraint violated on {}", field_label(.field))]
    UniqueViolation { field: Option<UniqueField> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn field_label(field: &Option<UniqueField>) -> String {
    match field {
        Some(field) => field.to_string(),
        None => "unknown field".to_string(),
    }
}

/// Connection pool occupancy reported by `/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub open_connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError>;

    /// Inserts the account. The store assigns id, timestamps and version.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Cheap round trip used by the health and readiness health_limits
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Pool occupancy, for stores that keep one
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }
}

/// Postgres-backed repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = db_err.constraint().and_then(UniqueField::from_constraint);
            return RepositoryError::UniqueViolation { field };
        }
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let created: User = sqlx::query_as(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, phone_number, street_address,
                city, state, country, username, password_hash, accept_terms, newsletter
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.street_address)
        .bind(&user.city)
        .bind(&user.state)
        .bind(&user.country)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.accept_terms)
        .bind(user.newsletter)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        tracing::info!(user_id = %created.id, username = %created.username, "account created");
        Ok(created)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        Some(PoolStats {
            open_connections: self.pool.size(),
            idle_connections: self.pool.num_idle() as u32,
            max_connections: self.pool.options().get_max_connections(),
        })
    }
}
