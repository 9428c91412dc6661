//! Password hashing using argon2
//!
//! Provides salted password hashing and verification. The PHC hash string
//! embeds its own salt and cost parameters, so verification needs nothing
//! beyond the stored hash itself.
//!
//! # Performance Considerations
//!
//! Argon2 is intentionally CPU-intensive. In async contexts use the
//! `*_async` variants, which run on the blocking thread pool.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

/// Password hashing service
///
/// Uses Argon2id, which provides resistance against both side-channel and
/// GPU-based attacks.
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using argon2 (blocking operation)
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Hash a password asynchronously (non-blocking)
    ///
    /// Spawns the CPU-intensive work on a blocking thread pool,
    /// preventing it from blocking the async runtime.
    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// Mismatches are an expected outcome, not an error: this never fails,
    /// it returns `false`. A stored hash that cannot be parsed also yields
    /// `false` (with a warning), since such a credential can never match.
    pub fn verify(password: &str, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Verify a password asynchronously (non-blocking)
    ///
    /// Spawns the CPU-intensive work on a blocking thread pool.
    pub async fn verify_async(password: String, stored_hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &stored_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))
    }
}
