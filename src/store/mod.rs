//! Persistence for users and donations.
//!
//! Handlers only see the [`Store`] trait object. Production uses
//! [`postgres::PgStore`]; [`memory::MemoryStore`] keeps everything in process
//! and backs the HTTP tests.
//!
//! Password hashing lives here too: a store receives the plaintext secret in
//! [`NewUser`] and only ever persists the salted hash.

pub mod credentials;
mod error;
pub mod memory;
pub mod postgres;

pub use credentials::PasswordError;
pub use error::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Full user record, including secrets. Never serialized.
#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub contact: String,
    pub email: String,
    pub(crate) password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public projection with the password hash and refresh token removed.
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            contact: self.contact.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Compare a candidate password against the stored hash.
    ///
    /// # Errors
    /// Returns an error if the stored hash is malformed or the hashing task fails.
    pub async fn is_password_correct(&self, candidate: &str) -> Result<bool, PasswordError> {
        credentials::verify_password(self.password_hash.clone(), candidate.to_string()).await
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("contact", &self.contact)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "***"),
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub contact: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated registration input. `email` must already be normalized.
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub contact: String,
    pub email: String,
    pub password: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub donor: Uuid,
    pub food: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
    pub location: String,
    pub postal: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated donation input. `postal` must already be normalized.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub food: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
    pub location: String,
    pub postal: String,
    pub contact: String,
    pub food_image: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Hash the password and insert the user.
    ///
    /// Returns [`StoreError::Conflict`] when the email is already taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Trusted internal write of the session's refresh token.
    /// Returns `false` when no user has this id.
    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError>;

    /// Replace the stored refresh token with `next` only if it still equals
    /// `current`. Returns `false` when the token was already rotated or cleared.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError>;

    /// Remove the stored refresh token. Clearing an already empty field succeeds.
    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DonationStore: Send + Sync {
    async fn create_donation(
        &self,
        donor: Uuid,
        donation: NewDonation,
    ) -> Result<Donation, StoreError>;

    /// All donations, newest first.
    async fn list_donations(&self) -> Result<Vec<Donation>, StoreError>;

    /// Donations whose normalized postal code equals `postal`, newest first.
    async fn donations_by_postal(&self, postal: &str) -> Result<Vec<Donation>, StoreError>;
}

pub trait Store: UserStore + DonationStore {}

impl<T: UserStore + DonationStore> Store for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            contact: "9876543210".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            refresh_token: Some("refresh".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_projection_omits_secrets() -> anyhow::Result<()> {
        let user = sample_user();
        let value = serde_json::to_value(user.public())?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("expected object"))?;

        assert_eq!(object.get("_id"), Some(&serde_json::json!(user.id)));
        assert_eq!(object.get("firstName"), Some(&serde_json::json!("Ada")));
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("passwordHash"));
        assert!(!object.contains_key("refreshToken"));
        Ok(())
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", sample_user());
        assert!(!rendered.contains("argon2id"));
        assert!(!rendered.contains("\"refresh\""));
        assert!(rendered.contains("ada@example.com"));
    }
}
