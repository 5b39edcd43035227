//! Generic webhook provider.
//!
//! Posts each email as JSON to a configured URL. Useful for in-house relays
//! or vendors without a dedicated provider here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::client::{HTTP_CLIENT, excerpt};
use super::provider::{DeliveryError, FailureKind, MailProvider, ProviderInfo};
use crate::config::ProviderSettings;
use crate::error::{AppError, AppResult};
use crate::models::{Email, Sender};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    id: Uuid,
    from: &'a Sender,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cc: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bcc: Option<&'a str>,
    subject: &'a str,
    body: &'a str,
    charset: &'a str,
}

pub struct WebhookProvider {
    info: ProviderInfo,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl WebhookProvider {
    pub fn new(
        info: ProviderInfo,
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            info,
            url: url.into(),
            api_key,
            timeout,
        }
    }

    pub fn from_settings(settings: &ProviderSettings) -> AppResult<Self> {
        let url = settings.credentials.endpoint.clone().ok_or_else(|| {
            AppError::configuration(
                format!("mailer.providers.{}.credentials.endpoint", settings.name),
                "Webhook providers require an endpoint",
            )
        })?;

        Ok(Self::new(
            ProviderInfo::from_settings(settings),
            url,
            settings.credentials.api_key.clone(),
            Duration::from_secs(settings.credentials.timeout_seconds),
        ))
    }
}

#[async_trait]
impl MailProvider for WebhookProvider {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError> {
        let payload = WebhookPayload {
            id: email.id,
            from: email.sender_or(&self.info.sender),
            to: &email.to,
            cc: email.cc.as_deref(),
            bcc: email.bcc.as_deref(),
            subject: &email.subject,
            body: &email.body,
            charset: &email.charset,
        };

        let mut request = HTTP_CLIENT
            .post(&self.url)
            .timeout(self.timeout)
            .json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let kind = if status.is_client_error() {
            FailureKind::Rejected
        } else {
            FailureKind::Unclassified
        };
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::new(
            kind,
            format!("webhook returned {status}: {}", excerpt(&body)),
        ))
    }

    async fn start(&self) -> AppResult<()> {
        self.info.set_ready(true);
        tracing::info!(provider = %self.info.name, url = %self.url, "Webhook provider started");
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
