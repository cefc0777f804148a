//! Configuration for the sync engine.

use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for request execution.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Prefix for request urls that start with `/`.
    pub base_url: Option<String>,
    /// Per-call timeout. `None` waits for the transport indefinitely.
    pub request_timeout: Option<Duration>,
    /// Headers added to every call; request headers take precedence.
    pub default_headers: BTreeMap<String, String>,
}

impl SyncConfig {
    /// Creates a configuration with no base url, no timeout and no headers.
    pub fn new() -> Self {
        Self {
            base_url: None,
            request_timeout: None,
            default_headers: BTreeMap::new(),
        }
    }

    /// Sets the base url.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    /// Sets the per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Adds a default header.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Resolves a request url against the base url.
    ///
    /// Absolute urls and urls without a leading `/` pass through unchanged.
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => format!("{}{}", base, url),
            _ => url.to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_base_url("https://api.example.com/wp-json/")
            .with_request_timeout(Duration::from_secs(15))
            .with_default_header("Content-Type", "application/json");

        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com/wp-json"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.default_headers.len(), 1);
    }

    #[test]
    fn default_has_no_timeout() {
        let config = SyncConfig::default();
        assert!(config.request_timeout.is_none());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn url_resolution() {
        let config = SyncConfig::new().with_base_url("https://api.example.com");
        assert_eq!(config.resolve_url("/groups"), "https://api.example.com/groups");
        assert_eq!(
            config.resolve_url("https://other.example.com/x"),
            "https://other.example.com/x"
        );

        let bare = SyncConfig::new();
        assert_eq!(bare.resolve_url("/groups"), "/groups");
    }
}
