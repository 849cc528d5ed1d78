use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════
// REGISTRATION INTAKE
// ═══════════════════════════════════════════════════════════════════════════

/// Signup payload once it has been parsed into its typed form.
///
/// Only the required-fields stage of the validation chain constructs this;
/// before that the request is raw bytes.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
    #[serde(default)]
    pub newsletter: bool,
}

// Credentials must never reach a log line.
impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("street_address", &self.street_address)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("country", &self.country)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .field("accept_terms", &self.accept_terms)
            .field("newsletter", &self.newsletter)
            .finish()
    }
}

/// Body returned by `POST /api/register` on success
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl RegistrationResponse {
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            message: "Registration successful".to_string(),
        }
    }
}

/// Body returned by the availability endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub message: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// ACCOUNTS
// ═══════════════════════════════════════════════════════════════════════════

/// A persisted account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub username: String,
    #[serde(skip)]
    pub password_hash: Vec<u8>,
    pub accept_terms: bool,
    pub newsletter: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: i32,
}

/// Record handed to the store when an account is created.
///
/// Identity, timestamps and the version counter are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub username: String,
    pub password_hash: Vec<u8>,
    pub accept_terms: bool,
    pub newsletter: bool,
}

impl NewUser {
    /// Builds the persistence record, dropping the plaintext password.
    pub fn from_request(req: RegistrationRequest, password_hash: Vec<u8>) -> Self {
        let phone_number = req.phone_number.filter(|p| !p.is_empty());
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number,
            street_address: req.street_address,
            city: req.city,
            state: req.state,
            country: req.country,
            username: req.username,
            password_hash,
            accept_terms: req.accept_terms,
            newsletter: req.newsletter,
        }
    }
}

/// Attribute protected by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniqueField {
    Email,
    Username,
}

impl UniqueField {
    /// Maps a Postgres constraint name onto the field it guards
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "users_email_key" => Some(UniqueField::Email),
            "users_username_key" => Some(UniqueField::Username),
            _ => None,
        }
    }
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Email => write!(f, "email"),
            UniqueField::Username => write!(f, "username"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: Some(String::new()),
            street_address: "12 Analytical Row".to_string(),
            city: "London".to_string(),
            state: "Greater London".to_string(),
            country: "GB".to_string(),
            username: "adalovelace".to_string(),
            password: "Engine1843!".to_string(),
            confirm_password: "Engine1843!".to_string(),
            accept_terms: true,
            newsletter: false,
        }
    }

    #[test]
    fn debug_output_redacts_passwords() {
        let rendered = format!("{:?}", request());
        assert!(!rendered.contains("Engine1843!"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("adalovelace"));
    }

    #[test]
    fn new_user_drops_empty_phone_number() {
        let record = NewUser::from_request(request(), b"hash".to_vec());
        assert_eq!(record.phone_number, None);
        assert_eq!(record.password_hash, b"hash".to_vec());
        assert_eq!(record.username, "adalovelace");
    }

    #[test]
    fn unique_field_from_constraint() {
        assert_eq!(
            UniqueField::from_constraint("users_email_key"),
            Some(UniqueField::Email)
        );
        assert_eq!(
            UniqueField::from_constraint("users_username_key"),
            Some(UniqueField::Username)
        );
        assert_eq!(UniqueField::from_constraint("users_pkey"), None);
        assert_eq!(UniqueField::Username.to_string(), "username");
    }
}
