//! The mailer service capability and the decorators layered around it.
//!
//! Every layer implements [`MailerService`] and owns the next one. The
//! composition is fixed by [`build_pipeline`]:
//!
//! ```text
//! Logging -> Instrumentation -> Authentication -> DispatchService
//! ```
//!
//! Logging and Instrumentation sit outside Authentication, so rejected
//! calls are still logged and counted.

mod authentication;
mod instrumentation;
mod logging;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

pub use authentication::Authentication;
pub use instrumentation::Instrumentation;
pub use logging::Logging;

use crate::auth::{AuthServer, RequestContext};
use crate::error::AppResult;
use crate::models::OutgoingMessage;
use crate::services::mailer::DispatchService;
use crate::telemetry::ServiceMeters;

/// Operations exposed to callers.
#[async_trait]
pub trait MailerService: Send + Sync {
    /// Exchange client credentials for a bearer token.
    async fn sign_in(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        secret: &str,
    ) -> AppResult<String>;

    async fn sign_out(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()>;

    async fn send(&self, ctx: &RequestContext, message: OutgoingMessage) -> AppResult<()>;
}

/// Operation names used in logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    SignIn,
    SignOut,
    Send,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::SignIn => "sign_in",
            Method::SignOut => "sign_out",
            Method::Send => "send",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service stack served by the HTTP layer.
pub type Pipeline = Logging<Instrumentation<Authentication<DispatchService>>>;

/// Wrap any inner service in the standard decorators.
pub fn compose<S: MailerService>(
    inner: S,
    auth: Arc<AuthServer>,
    meters: Arc<ServiceMeters>,
) -> Logging<Instrumentation<Authentication<S>>> {
    Logging::new(Instrumentation::new(Authentication::new(inner, auth), meters))
}

pub fn build_pipeline(
    dispatch: DispatchService,
    auth: Arc<AuthServer>,
    meters: Arc<ServiceMeters>,
) -> Pipeline {
    compose(dispatch, auth, meters)
}
