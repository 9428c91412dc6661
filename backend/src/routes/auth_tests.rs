//! Router-level tests for the authentication flows
//!
//! Drives the full router over the in-memory identity store: registration
//! through verification to login, the session endpoints, and the access
//! guard's redirect policy.

#[cfg(test)]
mod tests {
    use crate::auth::{PasswordService, TokenService, SESSION_COOKIE};
    use crate::config::AppConfig;
    use crate::mail::{Email, LogMailer, MailError, Mailer};
    use crate::repositories::{IdentityStore, MemoryIdentityStore, NewIdentity};
    use crate::routes::create_router;
    use crate::state::AppState;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Mailer that refuses every message
    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: &Email) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }

    fn test_state() -> (AppState, Arc<MemoryIdentityStore>) {
        let store = Arc::new(MemoryIdentityStore::new());
        let state = AppState::new(store.clone(), Arc::new(LogMailer), AppConfig::default());
        (state, store)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Extract `session_token=...` from the response's Set-Cookie header
    fn session_cookie_from(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("response should set the session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Seed a verified identity directly on the store
    async fn seed_verified(store: &MemoryIdentityStore, username: &str, password: &str) {
        let record = store
            .create_unverified(NewIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: PasswordService::hash(password).unwrap(),
            })
            .await
            .unwrap();
        store
            .set_verification_code(record.id, "123456", Utc::now() + Duration::minutes(15))
            .await
            .unwrap();
        assert!(store.confirm_verified(record.id, "123456").await.unwrap());
    }

    /// A valid session cookie for a seeded verified identity
    async fn authed_cookie(state: &AppState, store: &MemoryIdentityStore, username: &str) -> String {
        seed_verified(store, username, "correct horse").await;
        let record = store.find_by_username(username).await.unwrap().unwrap();
        let minted = state.tokens().mint(&record.identity()).unwrap();
        format!("{SESSION_COOKIE}={}", minted.token)
    }

    // ------------------------------------------------------------------
    // End-to-end: registration -> verification -> login
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_registration_and_login_flow() {
        let (state, store) = test_state();

        // Register
        let response = create_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-up",
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "correct horse"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let record = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(!record.is_verified);
        let code = record.verify_code.clone().expect("code issued at sign-up");

        // Login before verification is rejected, right password or not
        let response = create_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-in",
                json!({ "identifier": "alice", "password": "correct horse" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Wrong code is a mismatch
        let response = create_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/verify",
                json!({ "username": "alice", "code": "000000" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "CODE_MISMATCH");

        // Right code verifies the account
        let response = create_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/verify",
                json!({ "username": "alice", "code": code }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(store
            .find_by_username("alice")
            .await
            .unwrap()
            .unwrap()
            .is_verified);

        // Login now succeeds and sets the HttpOnly session cookie
        let response = create_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-in",
                json!({ "identifier": "alice", "password": "correct horse" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = session_cookie_from(&response);

        let body = body_json(response).await;
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["name"], "alice");
        assert_eq!(body["user"]["is_verified"], true);

        // The cookie hydrates the session on subsequent requests
        let response = create_router(state)
            .oneshot(get_request("/api/v1/auth/session", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_sign_in_by_email_identifier() {
        let (state, store) = test_state();
        seed_verified(&store, "alice", "correct horse").await;

        let response = create_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-in",
                json!({ "identifier": "alice@example.com", "password": "correct horse" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejections_share_one_external_message() {
        let (state, store) = test_state();
        seed_verified(&store, "alice", "correct horse").await;

        // Unknown user and wrong password must be indistinguishable
        let unknown = create_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-in",
                json!({ "identifier": "ghost", "password": "whatever" }),
            ))
            .await
            .unwrap();
        let wrong_password = create_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-in",
                json!({ "identifier": "alice", "password": "wrong" }),
            ))
            .await
            .unwrap();

        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(unknown).await["error"]["message"],
            body_json(wrong_password).await["error"]["message"]
        );
    }

    #[tokio::test]
    async fn test_expired_code_reports_expired() {
        let (state, store) = test_state();
        let record = store
            .create_unverified(NewIdentity {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "$argon2id$fake".to_string(),
            })
            .await
            .unwrap();
        store
            .set_verification_code(record.id, "123456", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        let response = create_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/verify",
                json!({ "username": "alice", "code": "123456" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "CODE_EXPIRED");
    }

    #[tokio::test]
    async fn test_sign_up_with_taken_username_conflicts() {
        let (state, store) = test_state();
        seed_verified(&store, "alice", "correct horse").await;

        let response = create_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-up",
                json!({
                    "username": "alice",
                    "email": "other@example.com",
                    "password": "hunter22"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_sign_up_with_verified_email_conflicts() {
        let (state, store) = test_state();
        seed_verified(&store, "alice", "correct horse").await;

        let response = create_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-up",
                json!({
                    "username": "alice2",
                    "email": "alice@example.com",
                    "password": "hunter22"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_sign_up_rejects_invalid_input() {
        let (state, _) = test_state();

        let cases = [
            json!({ "username": "a", "email": "a@example.com", "password": "hunter22" }),
            json!({ "username": "alice", "email": "not-an-email", "password": "hunter22" }),
            json!({ "username": "alice", "email": "a@example.com", "password": "short" }),
        ];
        for body in cases {
            let response = create_router(state.clone())
                .oneshot(json_request("POST", "/api/v1/auth/sign-up", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_sign_up_reports_delivery_failure_but_keeps_code() {
        let store = Arc::new(MemoryIdentityStore::new());
        let state = AppState::new(store.clone(), Arc::new(FailingMailer), AppConfig::default());

        let response = create_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/sign-up",
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "correct horse"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await["error"]["code"],
            "EMAIL_DELIVERY_FAILED"
        );

        // The undelivered code is still persisted for the resend path
        let record = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(record.verify_code.is_some());
    }

    // ------------------------------------------------------------------
    // Access guard redirects
    // ------------------------------------------------------------------

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .expect("redirect should carry a Location header")
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_guard_redirects_anonymous_dashboard_to_sign_in() {
        let (state, _) = test_state();
        let response = create_router(state)
            .oneshot(get_request("/dashboard/inbox", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/sign-in");
    }

    #[tokio::test]
    async fn test_guard_redirects_authenticated_sign_in_to_dashboard() {
        let (state, store) = test_state();
        let cookie = authed_cookie(&state, &store, "alice").await;

        let response = create_router(state)
            .oneshot(get_request("/sign-in", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn test_guard_allows_anonymous_sign_in_page() {
        let (state, _) = test_state();
        let response = create_router(state)
            .oneshot(get_request("/sign-in", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_guard_allows_authenticated_dashboard() {
        let (state, store) = test_state();
        let cookie = authed_cookie(&state, &store, "alice").await;

        let response = create_router(state)
            .oneshot(get_request("/dashboard/inbox", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_guard_redirects_authenticated_root_to_dashboard() {
        let (state, store) = test_state();
        let cookie = authed_cookie(&state, &store, "alice").await;

        let response = create_router(state)
            .oneshot(get_request("/", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn test_guard_treats_expired_token_as_anonymous() {
        let (state, _) = test_state();

        // Same secret, expiry already in the past
        let expired_minter = TokenService::new("development-secret-change-in-production", -60);
        let record = crate::repositories::Identity {
            id: uuid::Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            is_verified: true,
            is_accepting_messages: true,
        };
        let minted = expired_minter.mint(&record).unwrap();
        let cookie = format!("{SESSION_COOKIE}={}", minted.token);

        let response = create_router(state)
            .oneshot(get_request("/dashboard/inbox", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/sign-in");
    }

    // ------------------------------------------------------------------
    // Session endpoint authentication
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_session_without_cookie_returns_401() {
        let (state, _) = test_state();
        let response = create_router(state)
            .oneshot(get_request("/api/v1/auth/session", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_with_wrong_secret_token_returns_401() {
        let (state, _) = test_state();

        let forger = TokenService::new("some-other-secret", 3600);
        let record = crate::repositories::Identity {
            id: uuid::Uuid::new_v4(),
            username: "mallory".to_string(),
            email: "mallory@example.com".to_string(),
            is_verified: true,
            is_accepting_messages: true,
        };
        let minted = forger.mint(&record).unwrap();
        let cookie = format!("{SESSION_COOKIE}={}", minted.token);

        let response = create_router(state)
            .oneshot(get_request("/api/v1/auth/session", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_supersedes_the_session_token() {
        let (state, store) = test_state();
        let cookie = authed_cookie(&state, &store, "alice").await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/session/refresh")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let fresh = session_cookie_from(&response);
        assert!(fresh.starts_with(SESSION_COOKIE));
    }

    #[tokio::test]
    async fn test_sign_out_clears_the_cookie() {
        let (state, store) = test_state();
        let cookie = authed_cookie(&state, &store, "alice").await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/sign-out")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let removal = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(removal.starts_with(&format!("{SESSION_COOKIE}=")));
    }

    // ------------------------------------------------------------------
    // Malformed token property
    // ------------------------------------------------------------------

    /// Generate random invalid tokens
    fn invalid_token_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            // Empty token
            Just("".to_string()),
            // Random string (not a valid JWT)
            "[a-zA-Z0-9]{10,50}".prop_map(|s| s),
            // Malformed JWT (wrong number of parts)
            "[a-zA-Z0-9]{10}\\.[a-zA-Z0-9]{10}".prop_map(|s| s),
            // Valid format but invalid signature
            "[a-zA-Z0-9_-]{20}\\.[a-zA-Z0-9_-]{20}\\.[a-zA-Z0-9_-]{20}".prop_map(|s| s),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: any malformed session cookie yields 401 on the session
        /// endpoint, with no way to tell the failure modes apart.
        #[test]
        fn prop_malformed_cookies_return_401(token in invalid_token_strategy()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (state, _) = test_state();
                let cookie = format!("{SESSION_COOKIE}={token}");

                let response = create_router(state)
                    .oneshot(get_request("/api/v1/auth/session", Some(&cookie)))
                    .await
                    .unwrap();

                prop_assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
                Ok(())
            })?;
        }
    }
}
