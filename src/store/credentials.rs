//! Salted password hashing (argon2id, PHC string format).
//!
//! Hashing is CPU bound, so both directions run on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("invalid password hash format")]
    InvalidHashFormat,
    #[error("password hashing task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a password with a fresh random salt.
///
/// # Errors
/// Returns an error if hashing fails or the blocking task panics.
pub async fn hash_password(password: SecretString) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    })
    .await?
}

/// Check `candidate` against a stored PHC hash.
///
/// # Errors
/// Returns an error if the stored hash cannot be parsed or the blocking task panics.
pub async fn verify_password(hash: String, candidate: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|_| PasswordError::InvalidHashFormat)?;
        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Hash(e.to_string())),
        }
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_salted_phc_string() -> anyhow::Result<()> {
        let first = hash_password(SecretString::from("s3cret-pass")).await?;
        let second = hash_password(SecretString::from("s3cret-pass")).await?;

        assert!(first.starts_with("$argon2id$"));
        assert!(!first.contains("s3cret-pass"));
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn verify_accepts_match_and_rejects_mismatch() -> anyhow::Result<()> {
        let hash = hash_password(SecretString::from("s3cret-pass")).await?;

        assert!(verify_password(hash.clone(), "s3cret-pass".to_string()).await?);
        assert!(!verify_password(hash.clone(), "wrong".to_string()).await?);
        assert!(!verify_password(hash, String::new()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn verify_rejects_malformed_hash() {
        let result = verify_password("not-a-hash".to_string(), "x".to_string()).await;
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }
}
