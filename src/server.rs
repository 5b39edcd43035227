//! HTTP server lifecycle
//!
//! Startup order: metrics recorder, credential store and auth server,
//! provider registry, service pipeline, listener. Providers are stopped
//! after the server has drained.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::create_router;
use crate::auth::{AuthServer, InMemoryCredentialStore};
use crate::config::{Environment, Settings};
use crate::error::{AppError, AppResult};
use crate::services::mailer::{DispatchService, ProviderRegistry};
use crate::services::pipeline::build_pipeline;
use crate::state::AppState;
use crate::telemetry::{ServiceMeters, install_prometheus_recorder};

pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run until a shutdown signal arrives.
    ///
    /// # Errors
    /// - A provider fails to build or start
    /// - The listen address cannot be bound
    pub async fn run(self) -> AppResult<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env(),
            "Application starting"
        );
        tracing::info!(
            host = %self.settings.server.host,
            port = self.settings.server.port,
            level = %self.settings.logger.level,
            clients = self.settings.auth.clients.len(),
            providers = self.settings.mailer.enabled_providers().count(),
            "Configuration loaded"
        );

        let metrics = match install_prometheus_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Metrics recorder unavailable, /metrics disabled");
                None
            }
        };

        let state = build_state(&self.settings).await?;
        let registry = Arc::clone(&state.registry);
        let state = match metrics {
            Some(handle) => state.with_metrics(handle),
            None => state,
        };

        let address = self.settings.server.address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(e) => {
                registry.stop_all().await;
                return Err(AppError::Internal {
                    source: anyhow::anyhow!("Failed to bind to {address}: {e}"),
                });
            }
        };
        tracing::info!(address = %address, "Server listening");

        let served = axum::serve(listener, create_router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await;

        registry.stop_all().await;
        served.map_err(|e| AppError::Internal { source: e.into() })?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Wire the auth server, provider registry and service pipeline.
///
/// Providers are started here; on error none are left running.
pub async fn build_state(settings: &Settings) -> AppResult<AppState> {
    let store = InMemoryCredentialStore::from_settings(&settings.auth.clients)?;
    let auth = Arc::new(AuthServer::new(
        Arc::new(store),
        settings.auth.signing_key.as_bytes(),
    ));
    tracing::info!(clients = settings.auth.clients.len(), "Auth server ready");

    let registry = Arc::new(ProviderRegistry::initialize(&settings.mailer.providers).await?);
    tracing::info!(providers = ?registry, "Provider registry ready");

    let dispatch = DispatchService::new(
        Arc::clone(&registry),
        Arc::clone(&auth),
        settings.mailer.charset.as_str(),
    );
    let pipeline = build_pipeline(dispatch, auth, Arc::new(ServiceMeters::new()));

    Ok(AppState::new(Arc::new(pipeline), registry))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RequestContext;
    use crate::config::loader::tests::MINIMAL_DEFAULT;
    use crate::services::pipeline::MailerService;
    use crate::services::pipeline::testing::{CLIENT_ID, SECRET, message};

    fn settings() -> Settings {
        toml::from_str(MINIMAL_DEFAULT).unwrap()
    }

    #[tokio::test]
    async fn test_build_state_wires_a_working_pipeline() {
        let state = build_state(&settings()).await.unwrap();
        assert_eq!(state.registry.len(), 1);
        assert!(state.registry.all_ready());

        let anonymous = RequestContext::default();
        let token = state
            .pipeline
            .sign_in(&anonymous, CLIENT_ID, SECRET)
            .await
            .unwrap();
        state
            .pipeline
            .send(&RequestContext::bearer(token), message())
            .await
            .unwrap();

        state.registry.stop_all().await;
        assert!(!state.registry.all_ready());
    }

    #[tokio::test]
    async fn test_build_state_fails_on_broken_provider() {
        let mut settings = settings();
        settings.mailer.providers[0].kind = crate::config::ProviderKind::Webhook;

        let result = build_state(&settings).await;
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }
}
