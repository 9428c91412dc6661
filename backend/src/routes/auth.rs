//! Authentication routes
//!
//! Registration, login, verification and session endpoints. The session
//! token travels in an HttpOnly cookie, so it is set and cleared here and
//! never handed to client-side script.

use crate::auth::{hydrate_session, AuthSession, PasswordService, SESSION_COOKIE};
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::repositories::NewIdentity;
use crate::services::{AuthService, ConfirmOutcome, VerificationService};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_cookies::{
    cookie::{time::Duration as CookieDuration, SameSite},
    Cookie, Cookies,
};
use validator::ValidateEmail;
use whisperbox_shared::types::{
    ApiResponse, ResendCodeRequest, SessionResponse, SignInRequest, SignUpRequest, VerifyRequest,
};
use whisperbox_shared::validation;

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/verify", post(verify))
        .route("/resend-code", post(resend_code))
        .route("/session", get(session))
        .route("/session/refresh", post(refresh_session))
        .route("/sign-out", post(sign_out))
}

/// Build the session cookie carrying a freshly minted token
fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(AppConfig::is_production());
    cookie.set_max_age(CookieDuration::seconds(max_age_secs));
    cookie
}

/// Register a new identity and send its verification code
///
/// POST /api/v1/auth/sign-up
///
/// An unverified registration with the same email is replaced in place so
/// an abandoned sign-up can restart. Delivery failure is reported as such;
/// the persisted code stays valid for a resend.
async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    validation::validate_username(&req.username).map_err(ApiError::Validation)?;
    if !req.email.validate_email() {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    validation::validate_password(&req.password).map_err(ApiError::Validation)?;

    if let Some(existing) = state
        .store()
        .find_by_username(&req.username)
        .await
        .map_err(ApiError::Internal)?
    {
        if existing.email != req.email {
            return Err(ApiError::Conflict("Username is already taken".to_string()));
        }
    }

    if let Some(existing) = state
        .store()
        .find_by_email(&req.email)
        .await
        .map_err(ApiError::Internal)?
    {
        if existing.is_verified {
            return Err(ApiError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
    }

    // Hash on the blocking pool (CPU-intensive)
    let password_hash = PasswordService::hash_async(req.password)
        .await
        .map_err(ApiError::Internal)?;

    let record = state
        .store()
        .create_unverified(NewIdentity {
            username: req.username,
            email: req.email,
            password_hash,
        })
        .await
        .map_err(ApiError::Internal)?;

    VerificationService::issue(state.store(), state.mailer(), state.config(), &record).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Account created; a verification code has been sent to your email",
        )),
    ))
}

/// Login with username or email
///
/// POST /api/v1/auth/sign-in
///
/// All rejections surface as the same generic 401; mints the session token
/// and sets it as an HttpOnly cookie on success.
async fn sign_in(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let identity = AuthService::authenticate(state.store(), &req.identifier, &req.password).await?;

    let minted = state.tokens().mint(&identity).map_err(ApiError::Internal)?;
    let view = hydrate_session(&minted.claims)
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("minted token failed to hydrate")))?;

    cookies.add(session_cookie(
        minted.token,
        state.tokens().session_ttl_secs(),
    ));

    Ok(Json(view))
}

/// Submit a verification code
///
/// POST /api/v1/auth/verify
///
/// Expired and mismatched codes are distinct failures: only the former
/// should send the user to the resend flow.
async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<ApiResponse>> {
    match VerificationService::confirm(state.store(), &req.username, &req.code).await? {
        ConfirmOutcome::Accepted => Ok(Json(ApiResponse::ok("Account verified successfully"))),
        ConfirmOutcome::Expired => Err(ApiError::CodeExpired),
        ConfirmOutcome::Mismatched => Err(ApiError::CodeMismatch),
    }
}

/// Re-issue the verification code for an unverified account
///
/// POST /api/v1/auth/resend-code
async fn resend_code(
    State(state): State<AppState>,
    Json(req): Json<ResendCodeRequest>,
) -> ApiResult<Json<ApiResponse>> {
    VerificationService::resend(state.store(), state.mailer(), state.config(), &req.username)
        .await?;
    Ok(Json(ApiResponse::ok(
        "A fresh verification code has been sent to your email",
    )))
}

/// Current session, hydrated from the token claims
///
/// GET /api/v1/auth/session
async fn session(session: AuthSession) -> ApiResult<Json<SessionResponse>> {
    let view = hydrate_session(&session.claims)
        .map_err(|_| ApiError::Unauthorized("Not authenticated".to_string()))?;
    Ok(Json(view))
}

/// Mint a brand-new token from a live session
///
/// POST /api/v1/auth/session/refresh
///
/// Renewal supersedes the old token rather than extending it; claims are
/// re-read from the identity store, never taken from the client.
async fn refresh_session(
    State(state): State<AppState>,
    cookies: Cookies,
    session: AuthSession,
) -> ApiResult<Json<SessionResponse>> {
    let record = state
        .store()
        .find_by_username(&session.claims.username)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let minted = state
        .tokens()
        .mint(&record.identity())
        .map_err(ApiError::Internal)?;
    let view = hydrate_session(&minted.claims)
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("minted token failed to hydrate")))?;

    cookies.add(session_cookie(
        minted.token,
        state.tokens().session_ttl_secs(),
    ));

    Ok(Json(view))
}

/// Clear the session cookie
///
/// POST /api/v1/auth/sign-out
///
/// The token itself stays valid until expiry; there is no server-side
/// revocation in the stateless model.
async fn sign_out(cookies: Cookies) -> Json<ApiResponse> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);
    Json(ApiResponse::ok("Signed out"))
}
