//! Configuration management for restcli.
//!
//! Configuration is read from the `"config"` object of the project file and
//! merged with defaults. There is no global instance: the loaded
//! [`ClientConfig`] is handed to whatever needs it, and command-line flags
//! are applied per invocation through [`ConfigOverrides`].

pub mod schema;

pub use schema::{ClientConfig, ConfigOverrides};

use log::warn;
use serde_json::Value;

/// Loads configuration from a JSON value.
///
/// Unparseable settings are reported and replaced by defaults; settings that
/// parse but fail validation are an error.
///
/// # Arguments
///
/// * `settings_json` - The project's `"config"` object, if present
///
/// # Returns
///
/// `Ok(ClientConfig)` with the loaded configuration, or `Err` if validation fails.
///
/// # Example
///
/// ```
/// use restcli::config::load_config;
/// use serde_json::json;
///
/// let config = load_config(Some(json!({ "timeoutMs": 60000 }))).unwrap();
/// assert_eq!(config.timeout_ms, 60000);
/// assert!(config.verify_tls);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<ClientConfig, String> {
    let config = match settings_json {
        Some(settings) => serde_json::from_value::<ClientConfig>(settings).unwrap_or_else(|e| {
            warn!("Failed to parse project config: {}. Using defaults.", e);
            ClientConfig::default()
        }),
        None => ClientConfig::default(),
    };

    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;

    Ok(config)
}
