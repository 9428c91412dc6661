//! Route-level access guard
//!
//! A per-request decision over (path, token validity): authenticated
//! identities are bounced out of the auth entry pages, unauthenticated
//! requests are bounced off the dashboard. The policy is an ordered
//! first-match-wins rule table so it can be tested in isolation and
//! extended without touching control flow.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;

use super::jwt::Claims;

/// Name of the cookie carrying the session token
///
/// HttpOnly, so the token stays invisible to client-side script.
pub const SESSION_COOKIE: &str = "session_token";

const DASHBOARD: &str = "/dashboard";
const SIGN_IN: &str = "/sign-in";

/// What the guard decided for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

#[derive(Debug, Clone, Copy)]
enum RouteClass {
    /// Requires a valid session; others are sent to the login page
    Protected,
    /// Auth entry points; a live session is sent to the dashboard instead
    PublicOnly,
}

struct RouteRule {
    path: &'static str,
    /// `true` matches only the exact path, otherwise the path and anything
    /// below it (`/verify` matches `/verify/alice`, not `/verifyx`)
    exact: bool,
    class: RouteClass,
}

impl RouteRule {
    fn matches(&self, path: &str) -> bool {
        if self.exact {
            return path == self.path;
        }
        match path.strip_prefix(self.path) {
            Some("") => true,
            Some(rest) => rest.starts_with('/'),
            None => false,
        }
    }
}

/// Ordered policy table, evaluated top to bottom, first match wins.
///
/// The root path takes the same already-authenticated redirect as the auth
/// entry pages, but must be matched exactly so it does not swallow
/// everything else.
const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        path: "/dashboard",
        exact: false,
        class: RouteClass::Protected,
    },
    RouteRule {
        path: "/sign-up",
        exact: false,
        class: RouteClass::PublicOnly,
    },
    RouteRule {
        path: "/sign-in",
        exact: false,
        class: RouteClass::PublicOnly,
    },
    RouteRule {
        path: "/verify",
        exact: false,
        class: RouteClass::PublicOnly,
    },
    RouteRule {
        path: "/",
        exact: true,
        class: RouteClass::PublicOnly,
    },
];

/// Decide routing for a request path given token validity
///
/// Pure function, re-evaluated on every request; token validity is
/// time-dependent, so the outcome must never be cached across requests.
pub fn decide(path: &str, authenticated: bool) -> Decision {
    for rule in ROUTE_RULES {
        if !rule.matches(path) {
            continue;
        }
        return match (rule.class, authenticated) {
            (RouteClass::PublicOnly, true) => Decision::Redirect(DASHBOARD),
            (RouteClass::Protected, false) => Decision::Redirect(SIGN_IN),
            _ => Decision::Allow,
        };
    }
    Decision::Allow
}

/// Guard middleware applied to the page routes
///
/// Decodes the session cookie through the token codec; any decode failure
/// (absent, malformed, tampered, expired) counts as unauthenticated.
pub async fn guard_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    let authenticated = cookies
        .get(SESSION_COOKIE)
        .map(|cookie| state.tokens().decode(cookie.value()).is_ok())
        .unwrap_or(false);

    match decide(request.uri().path(), authenticated) {
        Decision::Allow => next.run(request).await,
        Decision::Redirect(target) => Redirect::to(target).into_response(),
    }
}

/// Authenticated session extracted from the session cookie
///
/// Rejects with a uniform 401 whether the token is absent, expired or
/// tampered with; the distinction is logged, never surfaced.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: Claims,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthorized("Not authenticated".to_string()))?;

        let token = cookies
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

        let claims = app_state.tokens().decode(&token).map_err(|err| {
            tracing::debug!(reason = %err, "session token rejected");
            ApiError::Unauthorized("Not authenticated".to_string())
        })?;

        Ok(AuthSession { claims })
    }
}
