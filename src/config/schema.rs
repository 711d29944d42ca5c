//! Configuration schema for a restcli project.
//!
//! The configuration lives in the project file under `"config"`. Every field
//! is optional on disk and falls back to its default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::variables::DEFAULT_PREFIX;

/// Per-project client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Request timeout in milliseconds.
    ///
    /// Maximum time to wait for a complete response (including connection,
    /// headers, and body download). Defaults to 30000ms (30 seconds).
    ///
    /// Must be greater than 0.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether to automatically follow HTTP redirects.
    ///
    /// When enabled, 3xx responses are followed up to `max_redirects` times.
    /// Defaults to true.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow. Defaults to 10.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Whether to validate TLS certificates.
    ///
    /// **Warning:** Disabling validation can expose you to security risks.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Lifetime in seconds for cookies that carry neither `Max-Age` nor
    /// `Expires`. Defaults to one day.
    #[serde(default = "default_cookie_lifetime_secs")]
    pub cookie_lifetime_secs: u64,

    /// Prefix that introduces a variable reference. Defaults to `$`.
    ///
    /// Must not be empty.
    #[serde(default = "default_variable_prefix")]
    pub variable_prefix: String,

    /// Whether sends are appended to the history file.
    #[serde(default = "default_true")]
    pub record_history: bool,

    /// Whether the cookie jar is written to the session file after sends.
    #[serde(default = "default_true")]
    pub record_session: bool,

    /// Maximum number of entries kept in history. Defaults to 1000.
    ///
    /// Must be > 0.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Whether sensitive headers are stripped before history is written.
    #[serde(default = "default_true")]
    pub sanitize_history: bool,

    /// Headers added to every request unless the request defines the same
    /// header itself. Defaults to a `User-Agent` header only.
    #[serde(default = "default_headers")]
    pub default_headers: BTreeMap<String, String>,
}

/// Per-invocation overrides taken from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `Some(false)` disables TLS verification (`-k`).
    pub verify_tls: Option<bool>,
    /// Replacement variable prefix (`--prefix`).
    pub variable_prefix: Option<String>,
    /// Replacement timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            verify_tls: default_verify_tls(),
            cookie_lifetime_secs: default_cookie_lifetime_secs(),
            variable_prefix: default_variable_prefix(),
            record_history: default_true(),
            record_session: default_true(),
            history_limit: default_history_limit(),
            sanitize_history: default_true(),
            default_headers: default_headers(),
        }
    }
}

impl ClientConfig {
    /// Validates the configuration and returns errors if any settings are invalid.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all settings are valid, or `Err` with a descriptive error message.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeoutMs must be greater than 0".to_string());
        }

        if self.history_limit == 0 {
            return Err("historyLimit must be greater than 0".to_string());
        }

        if self.variable_prefix.is_empty() {
            return Err("variablePrefix must not be empty".to_string());
        }

        // max_redirects can be 0 (no redirects)

        Ok(())
    }

    /// Returns the timeout as a `std::time::Duration`.
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Returns the default cookie lifetime as a `chrono::Duration`.
    pub fn cookie_lifetime(&self) -> chrono::Duration {
        // chrono durations are bounded by i64 milliseconds.
        let secs = i64::try_from(self.cookie_lifetime_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        chrono::Duration::seconds(secs)
    }

    /// Applies command-line overrides on top of this configuration.
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values given for this invocation (take precedence)
    ///
    /// # Returns
    ///
    /// A new `ClientConfig` with merged values.
    pub fn merge(&self, overrides: &ConfigOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(verify_tls) = overrides.verify_tls {
            merged.verify_tls = verify_tls;
        }
        if let Some(prefix) = &overrides.variable_prefix {
            merged.variable_prefix = prefix.clone();
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            merged.timeout_ms = timeout_ms;
        }
        merged
    }
}

// Default value functions for serde

fn default_timeout_ms() -> u64 {
    30000 // 30 seconds in milliseconds
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> u32 {
    10
}

fn default_verify_tls() -> bool {
    true
}

fn default_cookie_lifetime_secs() -> u64 {
    86400
}

fn default_variable_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

fn default_history_limit() -> usize {
    1000
}

fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(
        "User-Agent".to_string(),
        format!("restcli/{}", env!("CARGO_PKG_VERSION")),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_ms, 30000);
        assert!(config.follow_redirects);
        assert_eq!(config.max_redirects, 10);
        assert!(config.verify_tls);
        assert_eq!(config.cookie_lifetime_secs, 86400);
        assert_eq!(config.variable_prefix, "$");
        assert!(config.record_history);
        assert!(config.record_session);
        assert_eq!(config.history_limit, 1000);
        assert!(config.sanitize_history);
        assert_eq!(config.default_headers.len(), 1);
        assert!(config.default_headers["User-Agent"].starts_with("restcli/"));
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = ClientConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            "timeoutMs must be greater than 0"
        );
    }

    #[test]
    fn test_config_validation_zero_history_limit() {
        let config = ClientConfig {
            history_limit: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            "historyLimit must be greater than 0"
        );
    }

    #[test]
    fn test_config_validation_empty_prefix() {
        let config = ClientConfig {
            variable_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_redirects_allowed() {
        let config = ClientConfig {
            max_redirects: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_durations() {
        let config = ClientConfig {
            timeout_ms: 5000,
            cookie_lifetime_secs: 60,
            ..Default::default()
        };
        assert_eq!(config.timeout_duration(), std::time::Duration::from_millis(5000));
        assert_eq!(config.cookie_lifetime(), chrono::Duration::seconds(60));
    }

    #[test]
    fn test_merge_overrides() {
        let base = ClientConfig::default();
        let overrides = ConfigOverrides {
            verify_tls: Some(false),
            variable_prefix: Some("@".to_string()),
            timeout_ms: None,
        };

        let merged = base.merge(&overrides);
        assert!(!merged.verify_tls);
        assert_eq!(merged.variable_prefix, "@");
        assert_eq!(merged.timeout_ms, 30000); // Unchanged
    }

    #[test]
    fn test_deserialization_with_defaults() {
        let json = r#"{
            "timeoutMs": 60000,
            "verifyTls": false,
            "defaultHeaders": {"X-Team": "core"}
        }"#;

        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout_ms, 60000);
        assert!(!config.verify_tls);
        assert_eq!(config.default_headers.len(), 1);
        assert_eq!(config.default_headers["X-Team"], "core");
        // Other fields should have defaults
        assert!(config.follow_redirects);
        assert_eq!(config.history_limit, 1000);
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let json = serde_json::to_string(&ClientConfig::default()).unwrap();
        assert!(json.contains("\"timeoutMs\":30000"));
        assert!(json.contains("cookieLifetimeSecs"));
        assert!(json.contains("variablePrefix"));
    }
}
