//! Mail transport
//!
//! Delivery abstraction for the verification emails. The production
//! transport posts to a transactional-email HTTP API; local development
//! falls back to a sender that logs instead of sending. Delivery failure is
//! a reportable outcome, never a process fault, and never rolls back the
//! already-persisted verification code.

mod http_api;
pub mod template;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub use http_api::HttpApiMailer;

/// A rendered email ready for delivery
#[derive(Debug, Clone)]
pub struct Email {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Delivery failure reported back to the caller
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport request failed: {0}")]
    Transport(String),

    #[error("mail API rejected the message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Email delivery abstraction
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or report a distinct delivery failure
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Local dev sender that logs the message instead of sending real email
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(
            to_email = %email.to_email,
            subject = %email.subject,
            "mail delivery stub"
        );
        Ok(())
    }
}
