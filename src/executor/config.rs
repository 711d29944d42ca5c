//! HTTP request execution configuration.
//!
//! The transport-facing subset of [`ClientConfig`], converted once per
//! invocation into the types the sender works with.

use crate::config::ClientConfig;
use crate::models::Headers;
use std::time::Duration;

/// Configuration for HTTP request execution.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Maximum time to wait for a complete response (including connection,
    /// headers, and body download).
    pub timeout: Duration,

    /// Whether TLS certificates are validated.
    pub verify_tls: bool,

    /// Whether 3xx responses are followed.
    pub follow_redirects: bool,

    /// Redirect limit when following.
    pub max_redirects: u32,

    /// Lifetime for cookies set without `Max-Age` or `Expires`.
    pub cookie_lifetime: chrono::Duration,

    /// Headers added unless the request defines the same name.
    pub default_headers: Headers,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ExecutionConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            timeout: config.timeout_duration(),
            verify_tls: config.verify_tls,
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
            cookie_lifetime: config.cookie_lifetime(),
            default_headers: config
                .default_headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect(),
        }
    }
}
