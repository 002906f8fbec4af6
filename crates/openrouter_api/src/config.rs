use std::collections::BTreeMap;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::url::DEFAULT_OPENROUTER_BASE_URL;

/// Caller identification sent as `HTTP-Referer` when none is configured.
pub const DEFAULT_REFERER: &str = "http://localhost";
/// Caller identification sent as `X-Title` when none is configured.
pub const DEFAULT_TITLE: &str = "Advanced Web IDE";

/// Transport configuration for OpenRouter requests.
///
/// The credential is deliberately absent: it is supplied per exchange so the
/// host can change it between requests without rebuilding the client.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Base URL or full chat-completions endpoint.
    pub base_url: String,
    /// Caller page identification (`HTTP-Referer`).
    pub referer: String,
    /// Caller application title (`X-Title`).
    pub title: String,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional whole-request timeout.
    pub timeout: Option<Duration>,
    /// Attempt budget and backoff schedule.
    pub retry: RetryPolicy,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            extra_headers: BTreeMap::new(),
            timeout: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl OpenRouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
