//! Connection settings shared by both clients.

use std::time::Duration;

use cowput_protocol::constants::{
    DEFAULT_API_URL, DEFAULT_STORAGE_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};

/// Endpoints, identity and timeouts for the HTTP clients.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Management tier base URL (no trailing slash needed).
    pub api_url: String,
    /// Storage tier base URL.
    pub storage_url: String,
    pub user_agent: String,
    /// Timeout applied to every call.
    pub timeout: Duration,
    /// Cookie override. When set, cookies from responses are never captured.
    pub cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            storage_url: DEFAULT_STORAGE_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout: DEFAULT_TIMEOUT,
            cookie: None,
        }
    }
}

impl ClientConfig {
    /// Management tier base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Storage tier base URL without a trailing slash.
    pub fn storage_base(&self) -> &str {
        self.storage_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "https://cowtransfer.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.cookie.is_none());
    }

    #[test]
    fn bases_strip_trailing_slash() {
        let config = ClientConfig {
            api_url: "http://127.0.0.1:9000/".into(),
            storage_url: "http://127.0.0.1:9001//".into(),
            ..Default::default()
        };
        assert_eq!(config.api_base(), "http://127.0.0.1:9000");
        assert_eq!(config.storage_base(), "http://127.0.0.1:9001");
    }
}
