//! Password hashing
//!
//! Hashing is CPU-bound and slow on purpose; callers on the async runtime
//! should run it through `spawn_blocking`.

use thiserror::Error;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("cost factor {0} is outside 4..=31")]
    InvalidCost(u32),

    #[error("hashing failed: {0}")]
    Backend(String),

    #[error("hashing task did not complete: {0}")]
    Task(String),
}

/// Encoded password hash as it is stored
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(Vec<u8>);

impl PasswordHash {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for PasswordHash {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasswordHash({} bytes)", self.0.len())
    }
}

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str, cost: u32) -> Result<PasswordHash, HashError>;
}

/// Salted adaptive hashing with bcrypt
#[derive(Debug, Clone, Copy, Default)]
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str, cost: u32) -> Result<PasswordHash, HashError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(HashError::InvalidCost(cost));
        }
        let encoded =
            bcrypt::hash(plaintext, cost).map_err(|e| HashError::Backend(e.to_string()))?;
        Ok(PasswordHash(encoded.into_bytes()))
    }
}
