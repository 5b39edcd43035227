//! Base mailer service: token issuing and priority failover delivery.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use validator::Validate;

use super::provider::MailProvider;
use super::registry::ProviderRegistry;
use crate::auth::{AuthServer, RequestContext};
use crate::error::{AppError, AppResult};
use crate::models::{Email, OutgoingMessage};
use crate::services::pipeline::MailerService;

const PRIMARY_PRIORITY: u32 = 1;

/// Innermost [`MailerService`]. Expects the authentication layer to have
/// attached claims before `send` reaches it.
pub struct DispatchService {
    registry: Arc<ProviderRegistry>,
    auth: Arc<AuthServer>,
    charset: String,
}

impl DispatchService {
    pub fn new(registry: Arc<ProviderRegistry>, auth: Arc<AuthServer>, charset: impl Into<String>) -> Self {
        Self {
            registry,
            auth,
            charset: charset.into(),
        }
    }

    /// Try providers one at a time, primary first.
    ///
    /// The primary is always attempted. Any other provider is attempted only
    /// while the previous attempt asked for a retry and only if it is ready.
    pub async fn deliver(&self, email: &Email) -> AppResult<()> {
        let primary = self
            .registry
            .by_priority(PRIMARY_PRIORITY)
            .ok_or(AppError::NoProviderConfigured)?;

        let chain = std::iter::once(primary).chain(
            self.registry
                .providers()
                .iter()
                .filter(|p| !Arc::ptr_eq(p, primary)),
        );

        let mut failures = Vec::new();
        for (attempt, provider) in chain.enumerate() {
            if attempt > 0 && !provider.is_ready() {
                tracing::debug!(provider = %provider.name(), email_id = %email.id, "Skipping provider that is not ready");
                continue;
            }

            match provider.send(email).await {
                Ok(()) => {
                    tracing::info!(
                        provider = %provider.name(),
                        email_id = %email.id,
                        attempts = attempt + 1,
                        "Email delivered"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %provider.name(),
                        email_id = %email.id,
                        kind = %e.kind,
                        error = %e.message,
                        "Provider failed to deliver email"
                    );
                    let retry = e.retry();
                    failures.push(format!("{}: {}", provider.name(), e));
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(AppError::Delivery {
            email_id: email.id,
            reason: failures.join("; "),
        })
    }
}

#[async_trait]
impl MailerService for DispatchService {
    async fn sign_in(&self, _ctx: &RequestContext, client_id: &str, secret: &str) -> AppResult<String> {
        let auth = Arc::clone(&self.auth);
        let client_id = client_id.to_string();
        let secret = secret.to_string();

        // argon2 verification is CPU bound
        tokio::task::spawn_blocking(move || auth.authenticate(&client_id, &secret))
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::anyhow!("Sign-in task failed: {e}"),
            })?
    }

    async fn sign_out(&self, _ctx: &RequestContext, _id: Uuid) -> AppResult<()> {
        Err(AppError::NotImplemented {
            operation: "sign_out".to_string(),
        })
    }

    async fn send(&self, ctx: &RequestContext, message: OutgoingMessage) -> AppResult<()> {
        let claims = ctx.claims().ok_or_else(|| AppError::Unauthenticated {
            message: "Send requires an authenticated caller".to_string(),
        })?;
        message.validate()?;

        let email = Email::new(claims.sender(), message, self.charset.as_str());
        self.deliver(&email).await
    }
}
