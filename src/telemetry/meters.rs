use std::time::Duration;

use dashmap::DashMap;

use super::metrics::{REQUEST_DURATION_SECONDS, REQUESTS_TOTAL};
use crate::services::pipeline::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeterKey {
    pub method: Method,
    pub error: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub total_seconds: f64,
    pub max_seconds: f64,
}

/// Call counters and latency aggregates keyed by method and error flag.
#[derive(Debug, Default)]
pub struct ServiceMeters {
    entries: DashMap<MeterKey, LatencyStats>,
}

impl ServiceMeters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, method: Method, error: bool, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();

        {
            let mut stats = self.entries.entry(MeterKey { method, error }).or_default();
            stats.count += 1;
            stats.total_seconds += seconds;
            stats.max_seconds = stats.max_seconds.max(seconds);
        }

        let error = if error { "true" } else { "false" };
        metrics::counter!(REQUESTS_TOTAL, "method" => method.as_str(), "error" => error).increment(1);
        metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method.as_str(), "error" => error)
            .record(seconds);
    }

    pub fn count(&self, method: Method, error: bool) -> u64 {
        self.stats(method, error).count
    }

    pub fn stats(&self, method: Method, error: bool) -> LatencyStats {
        self.entries
            .get(&MeterKey { method, error })
            .map(|entry| *entry)
            .unwrap_or_default()
    }
}
