//! Credential authentication
//!
//! Orchestrates identifier lookup, verification-state gating and password
//! comparison. Rejections stay typed inside the process; the HTTP boundary
//! collapses them into one generic message so callers cannot probe which
//! step failed.

use thiserror::Error;
use tracing::warn;

use crate::auth::PasswordService;
use crate::error::ApiError;
use crate::repositories::{Identity, IdentityStore};

/// Why authentication was refused
///
/// The variants exist for logging and tests; `From<AuthError> for ApiError`
/// collapses all rejections into a single externally visible message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no identity matches the identifier")]
    NotFound,

    #[error("identity has not completed email verification")]
    Unverified,

    #[error("password mismatch")]
    InvalidPassword,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Credential authenticator
pub struct AuthService;

impl AuthService {
    /// Authenticate an identifier (username or email) with a password
    ///
    /// The steps run in strict order and each one short-circuits:
    /// lookup, verification gate, password comparison. The verification gate
    /// comes *before* the password check so an unverified account learns
    /// nothing about whether its password would have matched.
    ///
    /// On success the returned view has the password hash stripped, and the
    /// identity's last-login stamp is refreshed best-effort.
    pub async fn authenticate(
        store: &dyn IdentityStore,
        identifier: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let record = store
            .find_by_identifier(identifier)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !record.is_verified {
            return Err(AuthError::Unverified);
        }

        // Argon2 verification is CPU-bound; run it on the blocking pool
        let valid =
            PasswordService::verify_async(password.to_string(), record.password_hash.clone())
                .await?;
        if !valid {
            return Err(AuthError::InvalidPassword);
        }

        if let Err(err) = store.touch_last_login(record.id).await {
            warn!(user_id = %record.id, "failed to stamp last login: {err:#}");
        }

        Ok(record.identity())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotFound | AuthError::Unverified | AuthError::InvalidPassword => {
                // Internal distinction is for diagnostics; external callers
                // get one message for all three rejections.
                tracing::debug!(reason = %err, "sign-in rejected");
                ApiError::Unauthorized("Invalid username/email or password".to_string())
            }
            AuthError::Store(err) => ApiError::Internal(err),
        }
    }
}
