//! Application state management
//!
//! Shared state passed to all request handlers via Axum's state extraction.
//! Everything here is pre-computed at startup and read-only afterwards;
//! cloning is O(1) because every field is `Arc`-backed.

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::mail::Mailer;
use crate::repositories::IdentityStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Identity persistence, behind the narrow store contract
    store: Arc<dyn IdentityStore>,
    /// Mail transport for verification emails
    mailer: Arc<dyn Mailer>,
    /// Pre-initialized token codec with cached signing keys
    tokens: TokenService,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new application state
    ///
    /// Pre-computes the token signing keys from the config secret; call
    /// once at startup, not per-request.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        mailer: Arc<dyn Mailer>,
        config: AppConfig,
    ) -> Self {
        let tokens = TokenService::new(&config.auth.token_secret, config.auth.session_ttl_secs);

        Self {
            store,
            mailer,
            tokens,
            config: Arc::new(config),
        }
    }

    #[inline]
    pub fn store(&self) -> &dyn IdentityStore {
        self.store.as_ref()
    }

    #[inline]
    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    #[inline]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
