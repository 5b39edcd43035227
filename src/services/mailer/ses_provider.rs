//! Amazon SES v2 provider.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sesv2::Client;
use aws_sdk_sesv2::config::retry::RetryConfig;
use aws_sdk_sesv2::config::timeout::TimeoutConfig;
use aws_sdk_sesv2::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_sesv2::error::{DisplayErrorContext, SdkError};
use aws_sdk_sesv2::operation::send_email::SendEmailError;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use tokio::sync::OnceCell;

use super::provider::{DeliveryError, FailureKind, MailProvider, ProviderInfo};
use crate::config::ProviderSettings;
use crate::error::{AppError, AppResult};
use crate::models::Email;

/// Sends through the SES v2 `SendEmail` operation.
///
/// The SDK client is built by `start`. Static keys are used when configured,
/// otherwise the default AWS credential chain. SDK retries are off: failover
/// to the next provider is the retry.
pub struct SesProvider {
    info: ProviderInfo,
    region: String,
    static_keys: Option<(String, String)>,
    endpoint: Option<String>,
    configuration_set: Option<String>,
    timeout: Duration,
    client: OnceCell<Client>,
}

impl SesProvider {
    pub fn from_settings(settings: &ProviderSettings) -> AppResult<Self> {
        let credentials = &settings.credentials;
        let region = credentials
            .region
            .clone()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                AppError::configuration(
                    format!("mailer.providers.{}.credentials.region", settings.name),
                    "SES providers require a region",
                )
            })?;

        let static_keys = match (&credentials.access_key_id, &credentials.secret_access_key) {
            (Some(key), Some(secret)) => Some((key.clone(), secret.clone())),
            (None, None) => None,
            _ => {
                return Err(AppError::configuration(
                    format!("mailer.providers.{}.credentials", settings.name),
                    "access_key_id and secret_access_key must be set together",
                ));
            }
        };

        Ok(Self {
            info: ProviderInfo::from_settings(settings),
            region,
            static_keys,
            endpoint: credentials.endpoint.clone(),
            configuration_set: credentials.configuration_set.clone(),
            timeout: Duration::from_secs(credentials.timeout_seconds),
            client: OnceCell::new(),
        })
    }

    async fn connect(&self) -> Client {
        let region = Region::new(self.region.clone());
        let builder = match &self.static_keys {
            Some((key, secret)) => aws_sdk_sesv2::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(Credentials::new(key, secret, None, None, "mailrelay")),
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_sesv2::config::Builder::from(&shared)
            }
        };

        let mut builder = builder.retry_config(RetryConfig::disabled()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(self.timeout)
                .build(),
        );
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Client::from_conf(builder.build())
    }

    fn build_message(email: &Email) -> Result<Message, DeliveryError> {
        let content = |data: &str| {
            Content::builder()
                .data(data)
                .charset(&email.charset)
                .build()
                .map_err(|e| DeliveryError::new(FailureKind::Unclassified, e.to_string()))
        };

        Ok(Message::builder()
            .subject(content(&email.subject)?)
            .body(Body::builder().text(content(&email.body)?).build())
            .build())
    }
}

/// Map an SES error to a failure class.
fn classify<R>(error: &SdkError<SendEmailError, R>) -> FailureKind {
    match error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => FailureKind::Transport,
        _ => match error.as_service_error() {
            Some(SendEmailError::MessageRejected(_)) => FailureKind::Rejected,
            Some(SendEmailError::MailFromDomainNotVerifiedException(_)) => {
                FailureKind::DomainNotVerified
            }
            // NotFound is what SES v2 reports for a missing configuration set
            Some(
                SendEmailError::NotFoundException(_)
                | SendEmailError::AccountSuspendedException(_)
                | SendEmailError::SendingPausedException(_),
            ) => FailureKind::Configuration,
            _ => FailureKind::Unclassified,
        },
    }
}

#[async_trait]
impl MailProvider for SesProvider {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError> {
        let client = self.client.get().ok_or_else(|| {
            DeliveryError::new(FailureKind::Configuration, "ses client is not started")
        })?;

        let sender = email.sender_or(&self.info.sender);
        let destination = Destination::builder()
            .to_addresses(&email.to)
            .set_cc_addresses(email.cc.clone().map(|cc| vec![cc]))
            .set_bcc_addresses(email.bcc.clone().map(|bcc| vec![bcc]))
            .build();

        let output = client
            .send_email()
            .from_email_address(sender.mailbox())
            .destination(destination)
            .content(
                EmailContent::builder()
                    .simple(Self::build_message(email)?)
                    .build(),
            )
            .set_configuration_set_name(self.configuration_set.clone())
            .send()
            .await
            .map_err(|e| {
                DeliveryError::new(classify(&e), format!("ses: {}", DisplayErrorContext(&e)))
            })?;

        tracing::debug!(
            provider = %self.info.name,
            email_id = %email.id,
            message_id = output.message_id().unwrap_or_default(),
            "SES accepted email"
        );
        Ok(())
    }

    async fn start(&self) -> AppResult<()> {
        self.client.get_or_init(|| self.connect()).await;
        self.info.set_ready(true);
        tracing::info!(
            provider = %self.info.name,
            region = %self.region,
            static_keys = self.static_keys.is_some(),
            "SES provider started"
        );
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
