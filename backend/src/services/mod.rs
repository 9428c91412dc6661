//! Business logic services
//!
//! Services coordinate between the identity store, the password and token
//! primitives, and the mail transport.

pub mod auth;
pub mod verification;

pub use auth::{AuthError, AuthService};
pub use verification::{ConfirmOutcome, VerificationService};
