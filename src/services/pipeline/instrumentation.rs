use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use super::{MailerService, Method};
use crate::auth::RequestContext;
use crate::error::AppResult;
use crate::models::OutgoingMessage;
use crate::telemetry::ServiceMeters;

/// Counts calls and records latency per method and outcome.
pub struct Instrumentation<S> {
    inner: S,
    meters: Arc<ServiceMeters>,
}

impl<S> Instrumentation<S> {
    pub fn new(inner: S, meters: Arc<ServiceMeters>) -> Self {
        Self { inner, meters }
    }

    fn observe<T>(&self, method: Method, started: Instant, result: &AppResult<T>) {
        self.meters.record(method, result.is_err(), started.elapsed());
    }
}

#[async_trait]
impl<S: MailerService> MailerService for Instrumentation<S> {
    async fn sign_in(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        secret: &str,
    ) -> AppResult<String> {
        let started = Instant::now();
        let result = self.inner.sign_in(ctx, client_id, secret).await;
        self.observe(Method::SignIn, started, &result);
        result
    }

    async fn sign_out(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        let started = Instant::now();
        let result = self.inner.sign_out(ctx, id).await;
        self.observe(Method::SignOut, started, &result);
        result
    }

    async fn send(&self, ctx: &RequestContext, message: OutgoingMessage) -> AppResult<()> {
        let started = Instant::now();
        let result = self.inner.send(ctx, message).await;
        self.observe(Method::Send, started, &result);
        result
    }
}
