//! Session token encoding and validation
//!
//! Mints the signed, time-bounded session token carrying the identity's
//! claims, and validates incoming tokens with pre-computed keys.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use whisperbox_shared::types::{SessionResponse, SessionUser};

use crate::repositories::Identity;

/// Session token claims
///
/// A flat copy of the authenticated identity. Once minted the claims are
/// immutable; renewal mints a brand-new token rather than patching this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Why a token failed validation
///
/// The split exists for diagnostics only. Callers must treat both variants
/// as "not authenticated" and never surface the distinction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("session token expired")]
    Expired,
    #[error("session token invalid")]
    Invalid,
}

/// A freshly minted token together with the claims baked into it
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub claims: Claims,
}

/// Pre-computed signing keys, created once at startup
///
/// Key derivation is expensive, so the keys live in `AppState` behind `Arc`
/// and are shared across requests.
#[derive(Clone)]
struct TokenKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl TokenKeys {
    fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// Session token codec
///
/// Create once at application startup and store in `AppState`; cloning is
/// cheap because the keys are behind `Arc`.
#[derive(Clone)]
pub struct TokenService {
    keys: TokenKeys,
    session_ttl_secs: i64,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str, session_ttl_secs: i64) -> Self {
        let mut validation = Validation::default();
        // An expiry in the past must fail validation, not slide by on leeway.
        validation.leeway = 0;
        Self {
            keys: TokenKeys::new(secret),
            session_ttl_secs,
            validation,
        }
    }

    /// Mint a session token for an authenticated identity
    ///
    /// Sets `iat` to now and `exp` a fixed session TTL later. Tokens are
    /// superseded by re-issuance, never mutated.
    pub fn mint(&self, identity: &Identity) -> anyhow::Result<MintedToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.session_ttl_secs);

        let claims = Claims {
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            is_verified: identity.is_verified,
            is_accepting_messages: identity.is_accepting_messages,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to mint session token: {}", e))?;

        Ok(MintedToken { token, claims })
    }

    /// Validate a token and return its claims
    ///
    /// Bad signature, malformed structure and expiry all mean the same thing
    /// to callers: the request is not authenticated.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Session TTL in seconds
    #[inline]
    pub fn session_ttl_secs(&self) -> i64 {
        self.session_ttl_secs
    }
}

/// Map validated claims into the externally visible session shape
///
/// Pure mapping, no I/O. The username is mirrored into the generic `name`
/// field for collaborators that only know a display name.
pub fn hydrate_session(claims: &Claims) -> Result<SessionResponse, TokenError> {
    let id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Invalid)?;
    let expires_at: DateTime<Utc> = Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .ok_or(TokenError::Invalid)?;

    Ok(SessionResponse {
        user: SessionUser {
            id,
            username: claims.username.clone(),
            name: claims.username.clone(),
            email: claims.email.clone(),
            is_verified: claims.is_verified,
            is_accepting_messages: claims.is_accepting_messages,
        },
        expires_at,
    })
}
