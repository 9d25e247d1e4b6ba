//! Shared HTTP client and runtime.
//!
//! Adapters use async reqwest on a shared tokio runtime but present a
//! blocking interface, so the ingest loop stays strictly sequential.

use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

/// HTTP behaviour shared by all adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Retries for transient failures; 0 = fail fast
    pub max_retries: u32,
    /// First backoff delay, doubled on every attempt
    pub retry_base: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 0,
            retry_base: Duration::from_secs(2),
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install the process-wide HTTP config; only the first call wins
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::warn!("HTTP config already set, ignoring override");
    }
}

pub fn http_config() -> &'static HttpConfig {
    HTTP_CONFIG.get_or_init(HttpConfig::default)
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(http_config().connect_timeout)
        .user_agent(concat!("ledgerline/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Keep error bodies short enough for a log line
pub fn truncate_body(body: &str, max: usize) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }
    let mut end = max;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fails_fast() {
        let config = HttpConfig::default();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn truncate_short_body_untouched() {
        assert_eq!(truncate_body("  not found \n", 64), "not found");
    }

    #[test]
    fn truncate_long_body() {
        let body = "x".repeat(300);
        let out = truncate_body(&body, 10);
        assert_eq!(out, format!("{}…", "x".repeat(10)));
    }

    #[test]
    fn truncate_respects_char_boundary() {
        // 'é' is two bytes; cutting at 1 must back off to 0
        assert_eq!(truncate_body("éé", 1), "…");
    }
}
