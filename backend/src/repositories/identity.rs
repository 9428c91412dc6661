//! Identity records and the store contract

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Full identity row as persisted
///
/// Carries the password hash and any pending verification code; it must not
/// cross the service boundary. Handlers only ever see [`Identity`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdentityRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub verify_code: Option<String>,
    pub verify_code_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    /// The hash-stripped view of this record
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_verified: self.is_verified,
            is_accepting_messages: self.is_accepting_messages,
        }
    }
}

/// The authenticated subject as seen by everything above the services layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
}

/// Input for creating an unverified identity
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Narrow persistence contract for identity records
///
/// Implementations must enforce unique usernames and unique emails — the
/// identifier lookup is only well-defined under that invariant — and must
/// treat every call as potentially concurrent with other callers.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up by username or email, whichever matches
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<IdentityRecord>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>>;

    /// Create an unverified identity
    ///
    /// An existing *unverified* row with the same email is replaced in place
    /// (fresh password hash, same id), so an abandoned registration can be
    /// restarted. A verified row with that email is an error.
    async fn create_unverified(&self, identity: NewIdentity) -> Result<IdentityRecord>;

    /// Attach a pending verification code with its expiry
    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Atomically flip the identity to verified and consume the code
    ///
    /// Compare-and-update keyed on (id, unverified, exact code, unexpired);
    /// returns whether this call won the flip. Under concurrent confirms for
    /// the same code exactly one caller sees `true`.
    async fn confirm_verified(&self, id: Uuid, code: &str) -> Result<bool>;

    /// Best-effort last-login stamp after successful authentication
    async fn touch_last_login(&self, id: Uuid) -> Result<()>;

    /// Cheap connectivity probe for the readiness endpoint
    async fn ping(&self) -> Result<()>;
}
