//! SendGrid v3 provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::client::{HTTP_CLIENT, excerpt};
use super::provider::{DeliveryError, FailureKind, MailProvider, ProviderInfo};
use crate::config::ProviderSettings;
use crate::error::{AppError, AppResult};
use crate::models::Email;

pub const DEFAULT_SENDGRID_URL: &str = "https://api.sendgrid.com";

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<Address<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct CustomArgs {
    email_id: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    custom_args: CustomArgs,
}

/// Sends through `POST /v3/mail/send`.
pub struct SendGridProvider {
    info: ProviderInfo,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl SendGridProvider {
    pub fn new(
        info: ProviderInfo,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            info,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_settings(settings: &ProviderSettings) -> AppResult<Self> {
        let api_key = settings
            .credentials
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::configuration(
                    format!("mailer.providers.{}.credentials.api_key", settings.name),
                    "SendGrid providers require an api_key",
                )
            })?;

        Ok(Self::new(
            ProviderInfo::from_settings(settings),
            api_key,
            settings
                .credentials
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_SENDGRID_URL.to_string()),
            Duration::from_secs(settings.credentials.timeout_seconds),
        ))
    }

    fn build_request<'a>(&'a self, email: &'a Email) -> SendRequest<'a> {
        let sender = email.sender_or(&self.info.sender);
        let address = |addr: &'a str| Address {
            email: addr,
            name: None,
        };

        SendRequest {
            personalizations: vec![Personalization {
                to: vec![address(email.to.as_str())],
                cc: email.cc.as_deref().map(address).into_iter().collect(),
                bcc: email.bcc.as_deref().map(address).into_iter().collect(),
            }],
            from: Address {
                email: &sender.email,
                name: Some(sender.name.as_str()).filter(|n| !n.is_empty()),
            },
            subject: &email.subject,
            content: vec![
                Content {
                    kind: "text/plain",
                    value: &email.body,
                },
                Content {
                    kind: "text/html",
                    value: &email.body,
                },
            ],
            custom_args: CustomArgs {
                email_id: email.id.to_string(),
            },
        }
    }
}

/// Map a non-accepted SendGrid status to a failure class.
fn classify(status: StatusCode) -> FailureKind {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE => FailureKind::Rejected,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::Configuration,
        _ => FailureKind::Unclassified,
    }
}

#[async_trait]
impl MailProvider for SendGridProvider {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError> {
        let url = format!("{}/v3/mail/send", self.base_url);

        let response = HTTP_CLIENT
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&self.build_request(email))
            .send()
            .await
            .map_err(|e| DeliveryError::transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::new(
            classify(status),
            format!("sendgrid returned {status}: {}", excerpt(&body)),
        ))
    }

    async fn start(&self) -> AppResult<()> {
        self.info.set_ready(true);
        tracing::info!(provider = %self.info.name, base_url = %self.base_url, "SendGrid provider started");
        Ok(())
    }

    async fn stop(&self) -> AppResult<()> {
        self.info.set_ready(false);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn priority(&self) -> u32 {
        self.info.priority
    }

    fn is_ready(&self) -> bool {
        self.info.is_ready()
    }
}
