//! Environment management for the REST client
//!
//! The [`VariableStore`] partitions variables into named environments with a
//! default environment acting as the fallback for all others. Commands pick
//! the environment(s) they act on with an [`EnvSelector`].
//!
//! # Example
//!
//! ```
//! use restcli::environment::{VariableStore, DEFAULT_ENV};
//!
//! let mut store = VariableStore::new();
//! store.set_in("base_url", "http://localhost:3000", DEFAULT_ENV).unwrap();
//! store.set_in("base_url", "https://api.example.com", "prod").unwrap();
//!
//! store.set_current("prod").unwrap();
//! assert_eq!(store.get("BASE_URL"), Some("https://api.example.com"));
//! assert_eq!(store.get_from("base_url", "staging"), None);
//! ```

pub mod selector;
pub mod store;

pub use selector::EnvSelector;
pub use store::{display_env_name, StoreError, VariableStore, DEFAULT_ENV, DEFAULT_ENV_DISPLAY};
