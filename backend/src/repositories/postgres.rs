//! Postgres-backed identity store

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::identity::{IdentityRecord, IdentityStore, NewIdentity};

const RECORD_COLUMNS: &str = "id, username, email, password_hash, is_verified, \
     is_accepting_messages, verify_code, verify_code_expires_at, \
     last_login_at, created_at, updated_at";

/// Identity store backed by the `users` table
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<IdentityRecord>> {
        // Usernames and emails are both unique, so at most two rows can
        // match and only when a user signs in with someone else's handle as
        // their email; first match wins either way.
        let record = sqlx::query_as::<_, IdentityRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM users
            WHERE username = $1 OR email = $1
            LIMIT 1
            "#,
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>> {
        let record = sqlx::query_as::<_, IdentityRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM users
            WHERE username = $1
            "#,
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>> {
        let record = sqlx::query_as::<_, IdentityRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM users
            WHERE email = $1
            "#,
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create_unverified(&self, identity: NewIdentity) -> Result<IdentityRecord> {
        // Upsert on email: an unverified row is replaced in place (same id),
        // a verified row makes the update a no-op and surfaces as a conflict.
        let record = sqlx::query_as::<_, IdentityRecord>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET
                username = EXCLUDED.username,
                password_hash = EXCLUDED.password_hash,
                is_verified = FALSE,
                verify_code = NULL,
                verify_code_expires_at = NULL,
                updated_at = NOW()
            WHERE users.is_verified = FALSE
            RETURNING {RECORD_COLUMNS}
            "#,
        ))
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| anyhow::anyhow!("email is already registered to a verified account"))
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verify_code = $2,
                verify_code_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn confirm_verified(&self, id: Uuid, code: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verify_code = NULL,
                verify_code_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND is_verified = FALSE
              AND verify_code = $2
              AND verify_code_expires_at > NOW()
            "#,
        )
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
