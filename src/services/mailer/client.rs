use std::sync::LazyLock;
use std::time::Duration;

const USER_AGENT: &str = concat!("mailrelay/", env!("CARGO_PKG_VERSION"));

/// Process-wide HTTP client shared by the HTTP based providers.
///
/// Per-request timeouts come from each provider's descriptor; the values
/// here are upper bounds.
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
});

/// Trim a backend response body for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    const MAX: usize = 256;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
