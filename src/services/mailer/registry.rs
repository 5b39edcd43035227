//! Priority-ordered provider registry.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use super::create_provider;
use super::provider::MailProvider;
use crate::config::ProviderSettings;
use crate::error::{AppError, AppResult};

/// Providers sorted by ascending priority. Read-only once built.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MailProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| (p.priority(), p.name())))
            .finish()
    }
}

impl ProviderRegistry {
    /// Build and start every enabled provider in parallel.
    ///
    /// Fails fast: the first build or start error aborts the remaining tasks,
    /// stops providers that already started, and is returned.
    pub async fn initialize(descriptors: &[ProviderSettings]) -> AppResult<Self> {
        let started: Arc<Mutex<Vec<Arc<dyn MailProvider>>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for settings in descriptors.iter().filter(|d| d.enabled).cloned() {
            let started = Arc::clone(&started);
            tasks.spawn(async move {
                let provider = create_provider(&settings)?;
                provider.start().await?;
                tracing::debug!(provider = %settings.name, priority = settings.priority, "Provider ready");
                started.lock().await.push(provider);
                AppResult::Ok(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| AppError::Internal {
                source: anyhow::anyhow!("Provider initialization task failed: {e}"),
            });

            if let Err(error) = outcome.and_then(|result| result) {
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}

                let partial = Self {
                    providers: started.lock().await.clone(),
                };
                partial.stop_all().await;
                return Err(error);
            }
        }

        let providers = started.lock().await.clone();
        Self::freeze_or_stop(providers).await
    }

    /// [`ProviderRegistry::from_providers`], stopping every provider if the
    /// set is rejected.
    async fn freeze_or_stop(providers: Vec<Arc<dyn MailProvider>>) -> AppResult<Self> {
        match Self::from_providers(providers.clone()) {
            Ok(registry) => Ok(registry),
            Err(error) => {
                Self { providers }.stop_all().await;
                Err(error)
            }
        }
    }

    /// Freeze an already started set of providers.
    ///
    /// Priorities must be unique.
    pub fn from_providers(mut providers: Vec<Arc<dyn MailProvider>>) -> AppResult<Self> {
        providers.sort_by_key(|p| p.priority());

        if let Some(pair) = providers
            .windows(2)
            .find(|pair| pair[0].priority() == pair[1].priority())
        {
            return Err(AppError::configuration(
                "mailer.providers",
                format!(
                    "Providers '{}' and '{}' share priority {}",
                    pair[0].name(),
                    pair[1].name(),
                    pair[0].priority()
                ),
            ));
        }

        if providers.is_empty() {
            tracing::warn!("No mail providers enabled, every send will fail");
        }

        Ok(Self { providers })
    }

    /// Provider registered at `priority`, or the first provider when none is.
    pub fn by_priority(&self, priority: u32) -> Option<&Arc<dyn MailProvider>> {
        self.providers
            .iter()
            .find(|p| p.priority() == priority)
            .or_else(|| self.providers.first())
    }

    /// All providers, lowest priority value first.
    pub fn providers(&self) -> &[Arc<dyn MailProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn all_ready(&self) -> bool {
        self.providers.iter().all(|p| p.is_ready())
    }

    /// Stop every provider, logging failures instead of returning them.
    pub async fn stop_all(&self) {
        for provider in &self.providers {
            match provider.stop().await {
                Ok(()) => tracing::info!(provider = %provider.name(), "Provider stopped"),
                Err(e) => tracing::error!(provider = %provider.name(), error = %e, "Failed to stop provider"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderCredentials, ProviderKind, SenderSettings};
    use crate::services::mailer::MockProvider;

    fn descriptor(name: &str, kind: ProviderKind, priority: u32) -> ProviderSettings {
        ProviderSettings {
            name: name.to_string(),
            kind,
            enabled: true,
            priority,
            credentials: ProviderCredentials {
                api_key: Some("SG.key".to_string()),
                endpoint: Some("https://hooks.acme.test/mail".to_string()),
                timeout_seconds: 5,
                region: Some("eu-west-1".to_string()),
                ..ProviderCredentials::default()
            },
            sender: SenderSettings {
                name: "Acme".to_string(),
                email: "noreply@acme.test".to_string(),
            },
        }
    }

    fn mock(name: &str, priority: u32) -> Arc<dyn MailProvider> {
        Arc::new(MockProvider::new(name, priority))
    }

    #[test]
    fn test_sorted_by_priority() {
        let registry =
            ProviderRegistry::from_providers(vec![mock("c", 3), mock("a", 1), mock("b", 2)]).unwrap();
        let names: Vec<_> = registry.providers().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let result = ProviderRegistry::from_providers(vec![mock("a", 1), mock("b", 1)]);
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_by_priority_falls_back_to_first() {
        let registry = ProviderRegistry::from_providers(vec![mock("b", 5), mock("a", 2)]).unwrap();
        assert_eq!(registry.by_priority(5).unwrap().name(), "b");
        assert_eq!(registry.by_priority(1).unwrap().name(), "a");
        assert!(ProviderRegistry::default().by_priority(1).is_none());
    }

    #[tokio::test]
    async fn test_initialize_starts_enabled_providers_only() {
        let mut disabled = descriptor("off", ProviderKind::Mock, 3);
        disabled.enabled = false;

        let registry = ProviderRegistry::initialize(&[
            descriptor("hook", ProviderKind::Webhook, 2),
            descriptor("sendgrid", ProviderKind::Sendgrid, 1),
            disabled,
        ])
        .await
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.providers()[0].name(), "sendgrid");
        assert!(registry.all_ready());

        registry.stop_all().await;
        assert!(!registry.all_ready());
    }

    #[tokio::test]
    async fn test_initialize_fails_fast_on_bad_descriptor() {
        let mut broken = descriptor("sendgrid", ProviderKind::Sendgrid, 1);
        broken.credentials.api_key = None;

        let result =
            ProviderRegistry::initialize(&[broken, descriptor("local", ProviderKind::Mock, 2)]).await;
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_initialize_rejects_duplicate_priorities() {
        let result = ProviderRegistry::initialize(&[
            descriptor("a", ProviderKind::Mock, 1),
            descriptor("b", ProviderKind::Mock, 1),
        ])
        .await;
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_started_providers_are_stopped_when_freezing_fails() {
        let a = Arc::new(MockProvider::new("a", 1));
        let b = Arc::new(MockProvider::new("b", 1));
        let providers: Vec<Arc<dyn MailProvider>> = vec![a.clone(), b.clone()];

        let result = ProviderRegistry::freeze_or_stop(providers).await;

        assert!(result.is_err());
        assert!(!a.is_ready());
        assert!(!b.is_ready());
    }

    #[tokio::test]
    async fn test_initialize_empty() {
        let registry = ProviderRegistry::initialize(&[]).await.unwrap();
        assert!(registry.is_empty());
        assert!(registry.all_ready());
    }
}
