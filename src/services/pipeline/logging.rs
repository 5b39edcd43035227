use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use super::{MailerService, Method};
use crate::auth::RequestContext;
use crate::error::{AppError, AppResult};
use crate::models::OutgoingMessage;

const REDACTED: &str = "***";

/// Logs every call with a redacted view of its input, the outcome and the
/// elapsed time.
pub struct Logging<S> {
    inner: S,
}

impl<S> Logging<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

fn log_outcome(
    method: Method,
    ctx: &RequestContext,
    input: &str,
    started: Instant,
    error: Option<&AppError>,
) {
    let took_ms = started.elapsed().as_millis() as u64;
    let request_id = ctx.request_id().unwrap_or("-");

    match error {
        None => tracing::info!(%method, request_id, input, output = "ok", took_ms, "Mailer call"),
        Some(e) if matches!(e, AppError::Internal { .. }) => {
            tracing::error!(%method, request_id, input, error = ?e, took_ms, "Mailer call failed")
        }
        Some(e) => {
            tracing::warn!(%method, request_id, input, error = %e, took_ms, "Mailer call failed")
        }
    }
}

/// Summary of a message safe to log: addresses and subject, body by length.
fn summarize(message: &OutgoingMessage) -> String {
    format!(
        "to={} cc={} bcc={} subject={:?} body_len={}",
        message.to,
        message.cc.as_deref().unwrap_or("-"),
        message.bcc.as_deref().unwrap_or("-"),
        message.subject,
        message.body.len()
    )
}

#[async_trait]
impl<S: MailerService> MailerService for Logging<S> {
    async fn sign_in(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        secret: &str,
    ) -> AppResult<String> {
        let started = Instant::now();
        let result = self.inner.sign_in(ctx, client_id, secret).await;
        let input = format!("client_id={client_id} secret={REDACTED}");
        log_outcome(Method::SignIn, ctx, &input, started, result.as_ref().err());
        result
    }

    async fn sign_out(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        let started = Instant::now();
        let result = self.inner.sign_out(ctx, id).await;
        let input = format!("id={id}");
        log_outcome(Method::SignOut, ctx, &input, started, result.as_ref().err());
        result
    }

    async fn send(&self, ctx: &RequestContext, message: OutgoingMessage) -> AppResult<()> {
        let started = Instant::now();
        let input = summarize(&message);
        let result = self.inner.send(ctx, message).await;
        log_outcome(Method::Send, ctx, &input, started, result.as_ref().err());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pipeline::testing::*;
    use std::sync::Arc;

    #[test]
    fn test_summary_hides_body() {
        let mut msg = message();
        msg.body = "secret reset link https://acme.test/reset?t=abc".to_string();
        let summary = summarize(&msg);

        assert!(summary.contains("to=alice@example.com"));
        assert!(summary.contains(&format!("body_len={}", msg.body.len())));
        assert!(!summary.contains("reset?t=abc"));
    }

    #[tokio::test]
    async fn test_passes_results_through() {
        let inner = Arc::new(CountingService::default());
        let layer = Logging::new(inner.clone());
        let ctx = RequestContext::default().with_request_id("req-9");

        assert!(layer.send(&ctx, message()).await.is_ok());
        assert!(layer.sign_out(&ctx, Uuid::new_v4()).await.is_err());
        assert_eq!(inner.calls(), 2);
    }
}
