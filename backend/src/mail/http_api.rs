//! Transactional-email HTTP API transport

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

use super::{Email, MailError, Mailer};
use crate::config::MailConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSendBody {
    sender: ApiEmailAddress,
    to: Vec<ApiEmailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
}

/// Mailer posting JSON to a Brevo-compatible transactional email endpoint
pub struct HttpApiMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
    sender_email: String,
    sender_name: String,
}

impl HttpApiMailer {
    pub fn new(config: &MailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build mail HTTP client");

        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: SecretString::new(config.api_key.clone()),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpApiMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let body = ApiSendBody {
            sender: ApiEmailAddress {
                email: self.sender_email.clone(),
                name: Some(self.sender_name.clone()),
            },
            to: vec![ApiEmailAddress {
                email: email.to_email.clone(),
                name: Some(email.to_name.clone()),
            }],
            subject: email.subject.clone(),
            html_content: email.html_body.clone(),
            text_content: email.text_body.clone(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
