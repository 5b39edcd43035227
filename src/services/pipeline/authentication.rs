use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::MailerService;
use crate::auth::{AuthServer, Credential, RequestContext};
use crate::error::{AppError, AppResult};
use crate::models::OutgoingMessage;

/// Rejects calls without a valid bearer token before they reach `inner`.
///
/// `sign_in` is the only operation forwarded without a token.
pub struct Authentication<S> {
    inner: S,
    auth: Arc<AuthServer>,
}

impl<S> Authentication<S> {
    pub fn new(inner: S, auth: Arc<AuthServer>) -> Self {
        Self { inner, auth }
    }

    /// Validate the presented token and return a context carrying its claims.
    fn authorize(&self, ctx: &RequestContext) -> AppResult<RequestContext> {
        let token = match ctx.credential() {
            Credential::Bearer(token) => token,
            Credential::Missing => {
                return Err(AppError::Unauthenticated {
                    message: "missing bearer token".to_string(),
                });
            }
            Credential::Malformed => {
                return Err(AppError::Unauthenticated {
                    message: "malformed authorization header".to_string(),
                });
            }
        };

        let claims = self.auth.validate_token(token)?;
        Ok(ctx.authenticated(claims))
    }
}

#[async_trait]
impl<S: MailerService> MailerService for Authentication<S> {
    async fn sign_in(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        secret: &str,
    ) -> AppResult<String> {
        self.inner.sign_in(ctx, client_id, secret).await
    }

    async fn sign_out(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        let ctx = self.authorize(ctx)?;
        self.inner.sign_out(&ctx, id).await
    }

    async fn send(&self, ctx: &RequestContext, message: OutgoingMessage) -> AppResult<()> {
        let ctx = self.authorize(ctx)?;
        self.inner.send(&ctx, message).await
    }
}
