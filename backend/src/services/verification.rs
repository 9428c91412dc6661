//! One-time-code issuing and confirmation
//!
//! Issues a fresh code bound to an identity with a fixed TTL, delivers it
//! through the mail transport, and confirms submitted codes. The code is
//! persisted before delivery is attempted, so a failed send leaves a valid
//! code behind for the resend path.

use chrono::{Duration, Utc};
use tracing::warn;

use crate::auth::{codes_match, generate_code};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::mail::{template, Mailer};
use crate::repositories::{IdentityRecord, IdentityStore};

/// Result of a code confirmation
///
/// `Expired` and `Mismatched` are both rejections, but the caller's next
/// action differs: expired invites a resend, mismatched invites a retype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Accepted,
    Expired,
    Mismatched,
}

/// One-time-code issuer
pub struct VerificationService;

impl VerificationService {
    /// Issue a fresh verification code for an identity and deliver it
    ///
    /// A previously pending code is replaced. Delivery failure surfaces as
    /// [`ApiError::Delivery`]; the persisted code is untouched by it.
    pub async fn issue(
        store: &dyn IdentityStore,
        mailer: &dyn Mailer,
        config: &AppConfig,
        record: &IdentityRecord,
    ) -> Result<(), ApiError> {
        let code = generate_code(config.auth.code_length);
        let expires_at = Utc::now() + Duration::seconds(config.auth.code_ttl_secs);

        store
            .set_verification_code(record.id, &code, expires_at)
            .await
            .map_err(ApiError::Internal)?;

        let email = template::verification_email(
            &config.mail,
            &record.username,
            &record.email,
            &code,
        );
        mailer.send(&email).await.map_err(|err| {
            warn!(user_id = %record.id, "verification email delivery failed: {err}");
            ApiError::Delivery
        })
    }

    /// Confirm a submitted code for a username
    ///
    /// Expiry is checked before the value, so an expired code reports
    /// `Expired` even when it matches exactly. On acceptance the verified
    /// flip and code consumption happen in one atomic compare-and-update;
    /// losing that race reports `Mismatched`, since the code is spent.
    pub async fn confirm(
        store: &dyn IdentityStore,
        username: &str,
        submitted: &str,
    ) -> Result<ConfirmOutcome, ApiError> {
        let record = store
            .find_by_username(username)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("No account with that username".to_string()))?;

        let (Some(stored), Some(expires_at)) =
            (record.verify_code.as_deref(), record.verify_code_expires_at)
        else {
            // No pending code: either never issued or already consumed
            return Ok(ConfirmOutcome::Mismatched);
        };

        if expires_at <= Utc::now() {
            return Ok(ConfirmOutcome::Expired);
        }

        if !codes_match(submitted, stored) {
            return Ok(ConfirmOutcome::Mismatched);
        }

        let won = store
            .confirm_verified(record.id, stored)
            .await
            .map_err(ApiError::Internal)?;

        Ok(if won {
            ConfirmOutcome::Accepted
        } else {
            ConfirmOutcome::Mismatched
        })
    }

    /// Re-issue a code for an identity that never completed verification
    pub async fn resend(
        store: &dyn IdentityStore,
        mailer: &dyn Mailer,
        config: &AppConfig,
        username: &str,
    ) -> Result<(), ApiError> {
        let record = store
            .find_by_username(username)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("No account with that username".to_string()))?;

        if record.is_verified {
            return Err(ApiError::Conflict(
                "Account is already verified".to_string(),
            ));
        }

        Self::issue(store, mailer, config, &record).await
    }
}
