use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::service::mail_service::{EmailMessage, MailError, MailSender};

const UNISENDER_SEND_URL: &str =
    "https://go2.unisender.ru/ru/transactional/api/v1/email/send.json";

#[derive(Debug, Serialize)]
struct UniSenderRequest<'a> {
    api_key: &'a str,
    message: UniSenderMessage<'a>,
}

#[derive(Debug, Serialize)]
struct UniSenderMessage<'a> {
    recipients: Vec<UniSenderRecipient<'a>>,
    subject: &'a str,
    from_email: &'a str,
    from_name: &'a str,
    body: UniSenderBody<'a>,
    attachments: Vec<UniSenderAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct UniSenderRecipient<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct UniSenderBody<'a> {
    html: &'a str,
    plaintext: &'a str,
}

#[derive(Debug, Serialize)]
struct UniSenderAttachment<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct UniSenderResponse {
    error: Option<UniSenderError>,
}

#[derive(Debug, Deserialize)]
struct UniSenderError {
    message: Option<String>,
}

/// UniSender Go transactional API. The key travels both as a bearer header
/// and inside the payload, which is what the Go endpoint expects.
pub struct UniSenderClient {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl UniSenderClient {
    pub fn new(api_key: String, from_email: String, from_name: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from_email,
            from_name,
        }
    }
}

#[async_trait]
impl MailSender for UniSenderClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let request = UniSenderRequest {
            api_key: &self.api_key,
            message: UniSenderMessage {
                recipients: message
                    .recipients
                    .iter()
                    .map(|email| UniSenderRecipient { email })
                    .collect(),
                subject: &message.subject,
                from_email: &self.from_email,
                from_name: &self.from_name,
                body: UniSenderBody {
                    html: &message.html,
                    plaintext: &message.plaintext,
                },
                attachments: message
                    .attachments
                    .iter()
                    .map(|attachment| UniSenderAttachment {
                        content_type: &attachment.content_type,
                        name: &attachment.name,
                        content: &attachment.content_base64,
                    })
                    .collect(),
            },
        };

        let response = self
            .http
            .post(UNISENDER_SEND_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed: UniSenderResponse = serde_json::from_str(&text)
            .map_err(|_| MailError::MalformedResponse(text.clone()))?;

        if !status.is_success() || parsed.error.is_some() {
            let message = parsed
                .error
                .and_then(|err| err.message)
                .unwrap_or_else(|| format!("UniSender request failed with status {}", status));
            return Err(MailError::Provider(message));
        }
        Ok(())
    }
}
