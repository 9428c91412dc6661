//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generic operation outcome returned by mutation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request
///
/// `identifier` accepts either the username or the email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub identifier: String,
    pub password: String,
}

/// One-time-code submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub username: String,
    pub code: String,
}

/// Request a fresh verification code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendCodeRequest {
    pub username: String,
}

/// The authenticated subject as exposed to API clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    /// Mirror of `username` for collaborators that only know a display name
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
}

/// Hydrated session returned by the session endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_ok() {
        let resp = ApiResponse::ok("done");
        assert!(resp.success);
        assert_eq!(resp.message, "done");
    }

    #[test]
    fn test_session_user_round_trips_through_json() {
        let user = SessionUser {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            is_verified: true,
            is_accepting_messages: false,
        };

        let json = serde_json::to_string(&user).unwrap();
        let back: SessionUser = serde_json::from_str(&json).unwrap();
        assert_eq!(user, back);
    }
}
