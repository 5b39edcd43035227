//! Service metrics
//!
//! [`ServiceMeters`] keeps in-process aggregates for the instrumentation
//! layer and mirrors every sample to the `metrics` facade, which the
//! Prometheus recorder from [`install_prometheus_recorder`] exports.

mod meters;
mod metrics;

pub use self::meters::{LatencyStats, MeterKey, ServiceMeters};
pub use self::metrics::{REQUEST_DURATION_SECONDS, REQUESTS_TOTAL, describe_metrics, install_prometheus_recorder};
