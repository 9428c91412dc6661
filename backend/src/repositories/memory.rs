//! In-memory identity store
//!
//! Backs the service and router tests. Semantics mirror the Postgres store,
//! including the compare-and-update verification flip; a single mutex
//! stands in for the database's row-level atomicity.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::identity::{IdentityRecord, IdentityStore, NewIdentity};

#[derive(Default)]
pub struct MemoryIdentityStore {
    rows: Mutex<HashMap<Uuid, IdentityRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<IdentityRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .find(|row| row.username == identifier || row.email == identifier)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().find(|row| row.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().find(|row| row.email == email).cloned())
    }

    async fn create_unverified(&self, identity: NewIdentity) -> Result<IdentityRecord> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        let existing_id = rows
            .values()
            .find(|row| row.email == identity.email)
            .map(|row| (row.id, row.is_verified));

        if let Some((id, is_verified)) = existing_id {
            if is_verified {
                bail!("email is already registered to a verified account");
            }
            // Replace the abandoned registration in place, keeping the id
            let row = rows.get_mut(&id).unwrap();
            row.username = identity.username;
            row.email = identity.email;
            row.password_hash = identity.password_hash;
            row.is_verified = false;
            row.verify_code = None;
            row.verify_code_expires_at = None;
            row.updated_at = now;
            return Ok(row.clone());
        }

        if rows.values().any(|row| row.username == identity.username) {
            bail!("username is already taken");
        }

        let record = IdentityRecord {
            id: Uuid::new_v4(),
            username: identity.username,
            email: identity.email,
            password_hash: identity.password_hash,
            is_verified: false,
            is_accepting_messages: true,
            verify_code: None,
            verify_code_expires_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.get_mut(&id) {
            row.verify_code = Some(code.to_string());
            row.verify_code_expires_at = Some(expires_at);
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn confirm_verified(&self, id: Uuid, code: &str) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&id) else {
            return Ok(false);
        };

        let code_is_live = !row.is_verified
            && row.verify_code.as_deref() == Some(code)
            && row
                .verify_code_expires_at
                .is_some_and(|expires_at| expires_at > Utc::now());

        if !code_is_live {
            return Ok(false);
        }

        row.is_verified = true;
        row.verify_code = None;
        row.verify_code_expires_at = None;
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.get_mut(&id) {
            row.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
