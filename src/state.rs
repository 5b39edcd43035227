//! Shared state handed to every axum handler.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::services::mailer::ProviderRegistry;
use crate::services::pipeline::Pipeline;

/// Cloning is cheap; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Decorated mailer service every mail endpoint calls into
    pub pipeline: Arc<Pipeline>,
    /// Read-only view of the providers, for readiness checks
    pub registry: Arc<ProviderRegistry>,
    /// `None` when no Prometheus recorder is installed in this process
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            pipeline,
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
