//! Mail delivery: provider capability, concrete backends, the priority
//! registry and the dispatch service that walks it.

mod client;
mod dispatch_service;
mod mock_provider;
mod provider;
mod registry;
mod sendgrid_provider;
mod ses_provider;
mod webhook_provider;

use std::sync::Arc;

pub use dispatch_service::DispatchService;
pub use mock_provider::MockProvider;
pub use provider::{DeliveryError, FailureKind, MailProvider, ProviderInfo};
pub use registry::ProviderRegistry;
pub use sendgrid_provider::SendGridProvider;
pub use ses_provider::SesProvider;
pub use webhook_provider::WebhookProvider;

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::AppResult;

/// Build the provider a descriptor asks for. Does not start it.
pub fn create_provider(settings: &ProviderSettings) -> AppResult<Arc<dyn MailProvider>> {
    let provider: Arc<dyn MailProvider> = match settings.kind {
        ProviderKind::Ses => Arc::new(SesProvider::from_settings(settings)?),
        ProviderKind::Sendgrid => Arc::new(SendGridProvider::from_settings(settings)?),
        ProviderKind::Webhook => Arc::new(WebhookProvider::from_settings(settings)?),
        ProviderKind::Mock => Arc::new(MockProvider::from_settings(settings)),
    };
    Ok(provider)
}
