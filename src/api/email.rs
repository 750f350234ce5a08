//! Receipt email delivery.
//!
//! Handlers hand an `EmailMessage` to an `EmailSender`. `SendGridSender`
//! delivers through the `SendGrid` v3 API; `LogEmailSender` only logs the
//! message and is used for dry runs. When no sender is configured the receipt
//! email endpoint answers `Email not configured`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Email delivery abstraction.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error describing why it failed.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Dry-run sender that logs the message instead of sending it.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to,
            subject = %message.subject,
            body = %message.text,
            "email dry run"
        );
        Ok(())
    }
}

/// `SendGrid` v3 mail sender.
#[derive(Clone, Debug)]
pub struct SendGridSender {
    client: Client,
    api_key: SecretString,
    from: Option<String>,
    endpoint: String,
}

impl SendGridSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: SecretString, from: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Error creating reqwest client")?;

        Ok(Self {
            client,
            api_key,
            from,
            endpoint: SENDGRID_ENDPOINT.to_string(),
        })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Request body for the v3 `mail/send` endpoint. Without a configured sender
    /// address the message is sent from the recipient's own address.
    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        let from = self.from.as_deref().unwrap_or(&message.to);
        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": from },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.text }],
        })
    }
}

#[async_trait]
impl EmailSender for SendGridSender {
    #[instrument(skip(self, message), fields(to_email = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.payload(message))
            .send()
            .await
            .context("Error sending email request")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("SendGrid rejected email: {status} {body}"))
    }
}
