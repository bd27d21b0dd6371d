use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::service::mail_service::{EmailMessage, MailError, MailSender};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<SendGridPersonalization<'a>>,
    from: SendGridAddress<'a>,
    subject: &'a str,
    content: Vec<SendGridContent<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<SendGridAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization<'a> {
    to: Vec<SendGridAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct SendGridAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SendGridAttachment<'a> {
    content: &'a str,
    #[serde(rename = "type")]
    content_type: &'a str,
    filename: &'a str,
    disposition: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendGridErrorResponse {
    errors: Option<Vec<SendGridErrorItem>>,
}

#[derive(Debug, Deserialize)]
struct SendGridErrorItem {
    message: Option<String>,
}

pub struct SendGridClient {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl SendGridClient {
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
impl MailSender for SendGridClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        // Plaintext part must precede HTML per the v3 API.
        let request = SendGridRequest {
            personalizations: vec![SendGridPersonalization {
                to: message
                    .recipients
                    .iter()
                    .map(|email| SendGridAddress { email, name: None })
                    .collect(),
            }],
            from: SendGridAddress {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            subject: &message.subject,
            content: vec![
                SendGridContent {
                    content_type: "text/plain",
                    value: &message.plaintext,
                },
                SendGridContent {
                    content_type: "text/html",
                    value: &message.html,
                },
            ],
            attachments: message
                .attachments
                .iter()
                .map(|attachment| SendGridAttachment {
                    content: &attachment.content_base64,
                    content_type: &attachment.content_type,
                    filename: &attachment.name,
                    disposition: "attachment",
                })
                .collect(),
        };

        let response = self
            .http
            .post(SENDGRID_SEND_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            // 202 with an empty body on acceptance.
            return Ok(());
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<SendGridErrorResponse>(&text)
            .ok()
            .and_then(|parsed| parsed.errors)
            .and_then(|errors| errors.into_iter().find_map(|item| item.message))
            .unwrap_or_else(|| format!("SendGrid request failed with status {}", status));
        Err(MailError::Provider(message))
    }
}
