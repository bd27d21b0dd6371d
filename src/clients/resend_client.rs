use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::service::mail_service::{EmailMessage, MailError, MailSender};

const RESEND_SEND_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: String,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: Option<String>,
    message: Option<String>,
}

pub struct ResendClient {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl ResendClient {
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
impl MailSender for ResendClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: message.recipients.iter().map(String::as_str).collect(),
            subject: &message.subject,
            html: &message.html,
            text: &message.plaintext,
            attachments: message
                .attachments
                .iter()
                .map(|attachment| ResendAttachment {
                    filename: &attachment.name,
                    content: &attachment.content_base64,
                })
                .collect(),
        };

        let response = self
            .http
            .post(RESEND_SEND_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed: ResendResponse = serde_json::from_str(&text)
            .map_err(|_| MailError::MalformedResponse(text.clone()))?;

        if !status.is_success() || parsed.id.is_none() {
            let message = parsed
                .message
                .unwrap_or_else(|| format!("Resend request failed with status {}", status));
            return Err(MailError::Provider(message));
        }
        Ok(())
    }
}
