use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::clients::resend_client::ResendClient;
use crate::clients::sendgrid_client::SendGridClient;
use crate::clients::unisender_client::UniSenderClient;
use crate::config::Settings;

#[derive(Error, Debug)]
pub enum MailError {
    /// The provider accepted the request but reported a failure of its own.
    #[error("{0}")]
    Provider(String),

    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected provider response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub name: String,
    pub content_type: String,
    pub content_base64: String,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html: String,
    pub plaintext: String,
    pub attachments: Vec<MailAttachment>,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

pub fn build_sender(settings: &Settings) -> Result<Arc<dyn MailSender>, String> {
    match settings.mail_provider.as_str() {
        "unisender" => Ok(Arc::new(UniSenderClient::new(
            settings.mail_api_key.clone(),
            settings.from_email.clone(),
            settings.from_name.clone(),
        ))),
        "sendgrid" => Ok(Arc::new(SendGridClient::new(
            settings.mail_api_key.clone(),
            settings.from_email.clone(),
            settings.from_name.clone(),
        ))),
        "resend" => Ok(Arc::new(ResendClient::new(
            settings.mail_api_key.clone(),
            settings.from_email.clone(),
            settings.from_name.clone(),
        ))),
        other => Err(format!("Unknown mail provider: {}", other)),
    }
}
