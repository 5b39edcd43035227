use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{AppError, AppResult};

pub const REQUESTS_TOTAL: &str = "mailrelay_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "mailrelay_request_duration_seconds";

/// Histogram buckets in seconds. Sends include a backend round trip, so the
/// upper end goes past the usual HTTP defaults.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Install the global Prometheus recorder and return the handle used to
/// render `/metrics`.
pub fn install_prometheus_recorder() -> AppResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)
        .map_err(|e| AppError::Internal {
            source: anyhow::anyhow!("Invalid histogram buckets: {e}"),
        })?
        .install_recorder()
        .map_err(|e| AppError::Internal {
            source: anyhow::anyhow!("Failed to install Prometheus recorder: {e}"),
        })?;

    describe_metrics();
    Ok(handle)
}

pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Mailer service calls by method and outcome");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Mailer service call latency by method and outcome"
    );
}
