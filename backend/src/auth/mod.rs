//! Authentication primitives
//!
//! Session token codec, argon2 password verification, one-time verification
//! codes, and the route-level access guard.

mod guard;
mod jwt;
mod otp;
mod password;

pub use guard::{decide, guard_middleware, AuthSession, Decision, SESSION_COOKIE};
pub use jwt::{hydrate_session, Claims, MintedToken, TokenError, TokenService};
pub use otp::{codes_match, generate_code};
pub use password::PasswordService;
