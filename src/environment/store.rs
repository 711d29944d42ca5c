//! Layered variable store.
//!
//! Variables live in named environments. The default environment is named
//! `""` and acts as the fallback for every other environment: a lookup in
//! the current environment that misses falls through to the default.
//!
//! Variable names are case-insensitive and stored uppercase.

use crate::variables::{canonical_name, validate_variable_name, VarError, VariableSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the default environment.
pub const DEFAULT_ENV: &str = "";

/// Name shown to users in place of the default environment's empty name.
pub const DEFAULT_ENV_DISPLAY: &str = "(default)";

/// Returns the user-facing name of an environment.
pub fn display_env_name(env: &str) -> &str {
    if env == DEFAULT_ENV {
        DEFAULT_ENV_DISPLAY
    } else {
        env
    }
}

/// Errors raised by variable store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The variable name does not match the identifier grammar.
    InvalidVariableName(String),

    /// The named environment does not exist.
    UnknownEnvironment(String),

    /// The default environment can only be wiped through "delete all".
    CannotDeleteDefault,

    /// The default environment has no name to rename from or to.
    CannotRenameDefault,

    /// "Delete current" was requested while the current environment is the
    /// default; the caller must choose "delete all" explicitly.
    AmbiguousDefaultDeletion,

    /// The target environment name is already taken.
    EnvironmentExists(String),

    /// The environment name collides with the reserved display sentinel.
    ReservedEnvironmentName(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidVariableName(name) => write!(
                f,
                "Invalid variable name '{}': use letters, digits and underscores, not starting with a digit",
                name
            ),
            StoreError::UnknownEnvironment(env) => write!(f, "Unknown environment: {}", env),
            StoreError::CannotDeleteDefault => write!(
                f,
                "The default environment cannot be deleted on its own; delete all environments instead"
            ),
            StoreError::CannotRenameDefault => write!(
                f,
                "The default environment cannot be renamed, and no environment can take its place"
            ),
            StoreError::AmbiguousDefaultDeletion => write!(
                f,
                "The current environment is the default environment; use --all to delete every environment"
            ),
            StoreError::EnvironmentExists(env) => write!(f, "Environment already exists: {}", env),
            StoreError::ReservedEnvironmentName(env) => {
                write!(f, "Environment name '{}' is reserved", env)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<VarError> for StoreError {
    fn from(err: VarError) -> Self {
        StoreError::InvalidVariableName(err.name().to_string())
    }
}

/// Environment-partitioned variable storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawStore")]
pub struct VariableStore {
    /// Current environment name; empty for the default environment.
    current: String,

    /// Environment name to (canonical variable name to value).
    environments: BTreeMap<String, BTreeMap<String, String>>,
}

/// On-disk form; names are canonicalized on the way in.
#[derive(Deserialize)]
struct RawStore {
    #[serde(default)]
    current: String,
    #[serde(default)]
    environments: BTreeMap<String, BTreeMap<String, String>>,
}

impl From<RawStore> for VariableStore {
    fn from(raw: RawStore) -> Self {
        let environments = raw
            .environments
            .into_iter()
            .map(|(env, vars)| {
                let vars = vars
                    .into_iter()
                    .map(|(name, value)| (canonical_name(&name), value))
                    .collect();
                (env, vars)
            })
            .collect();
        Self {
            current: raw.current,
            environments,
        }
    }
}

impl VariableStore {
    /// Creates an empty store whose current environment is the default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the current environment (empty for the default).
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Switches the current environment.
    ///
    /// The environment does not need to exist yet; it springs into existence
    /// on the first write.
    pub fn set_current(&mut self, env: impl Into<String>) -> Result<(), StoreError> {
        let env = env.into();
        check_env_name(&env)?;
        self.current = env;
        Ok(())
    }

    /// Sets a variable in the current environment.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), StoreError> {
        let env = self.current.clone();
        self.set_in(name, value, &env)
    }

    /// Sets a variable in an explicit environment (`""` = default).
    pub fn set_in(&mut self, name: &str, value: impl Into<String>, env: &str) -> Result<(), StoreError> {
        let name = validate_variable_name(name)?;
        check_env_name(env)?;
        self.environments
            .entry(env.to_string())
            .or_default()
            .insert(name, value.into());
        Ok(())
    }

    /// Looks a variable up in the current environment, falling back to the
    /// default environment.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_from(name, &self.current)
            .or_else(|| self.get_from(name, DEFAULT_ENV))
    }

    /// Looks a variable up strictly in `env`, without fallback.
    pub fn get_from(&self, name: &str, env: &str) -> Option<&str> {
        self.environments
            .get(env)
            .and_then(|vars| vars.get(&canonical_name(name)))
            .map(String::as_str)
    }

    /// Removes a variable from `env`. Returns `true` if it was defined there.
    pub fn unset_in(&mut self, name: &str, env: &str) -> bool {
        let name = canonical_name(name);
        let removed = self
            .environments
            .get_mut(env)
            .map(|vars| vars.remove(&name).is_some())
            .unwrap_or(false);

        if self.environments.get(env).map_or(false, BTreeMap::is_empty) {
            self.environments.remove(env);
        }
        removed
    }

    /// Checks whether `name` resolves through [`VariableStore::get`].
    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Checks whether `name` is defined strictly in `env`.
    pub fn is_defined_in(&self, name: &str, env: &str) -> bool {
        self.get_from(name, env).is_some()
    }

    /// Non-default environments that define `name` explicitly, sorted.
    pub fn non_default_envs_with(&self, name: &str) -> Vec<String> {
        let name = canonical_name(name);
        // BTreeMap iteration is already sorted by environment name.
        self.environments
            .iter()
            .filter(|(env, vars)| env.as_str() != DEFAULT_ENV && vars.contains_key(&name))
            .map(|(env, _)| env.clone())
            .collect()
    }

    /// Names of the user environments, sorted. The default is never listed.
    pub fn environment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .environments
            .keys()
            .filter(|env| env.as_str() != DEFAULT_ENV)
            .cloned()
            .collect();
        if self.current != DEFAULT_ENV && !names.contains(&self.current) {
            names.push(self.current.clone());
            names.sort();
        }
        names
    }

    /// Checks whether an environment holds any variables.
    pub fn has_environment(&self, env: &str) -> bool {
        self.environments.contains_key(env)
    }

    /// Variables defined strictly in `env`, sorted by name.
    pub fn variables_in(&self, env: &str) -> Vec<(&str, &str)> {
        self.environments
            .get(env)
            .map(|vars| vars.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect())
            .unwrap_or_default()
    }

    /// Deletes a non-default environment and all of its variables.
    ///
    /// If it was the current environment, the default becomes current.
    pub fn delete_env(&mut self, env: &str) -> Result<(), StoreError> {
        if env == DEFAULT_ENV {
            return Err(StoreError::CannotDeleteDefault);
        }
        let existed = self.environments.remove(env).is_some();
        if self.current == env {
            self.current = DEFAULT_ENV.to_string();
        } else if !existed {
            return Err(StoreError::UnknownEnvironment(env.to_string()));
        }
        Ok(())
    }

    /// Deletes every environment, the default included.
    pub fn delete_all(&mut self) {
        self.environments.clear();
        self.current = DEFAULT_ENV.to_string();
    }

    /// Renames a non-default environment.
    pub fn rename_env(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        if from == DEFAULT_ENV || to == DEFAULT_ENV {
            return Err(StoreError::CannotRenameDefault);
        }
        check_env_name(to)?;
        if self.environments.contains_key(to) {
            return Err(StoreError::EnvironmentExists(to.to_string()));
        }
        let vars = self
            .environments
            .remove(from)
            .ok_or_else(|| StoreError::UnknownEnvironment(from.to_string()))?;
        self.environments.insert(to.to_string(), vars);
        if self.current == from {
            self.current = to.to_string();
        }
        Ok(())
    }

    /// Effective values for a single send.
    ///
    /// Default environment values, overlaid by the current environment,
    /// overlaid by `overrides`. The store itself is not modified.
    pub fn merged_set(&self, overrides: &VariableSet) -> VariableSet {
        let mut merged = VariableSet::new();
        if let Some(vars) = self.environments.get(DEFAULT_ENV) {
            merged.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if self.current != DEFAULT_ENV {
            if let Some(vars) = self.environments.get(&self.current) {
                merged.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        merged.extend(
            overrides
                .iter()
                .map(|(k, v)| (canonical_name(k), v.clone())),
        );
        merged
    }
}

fn check_env_name(env: &str) -> Result<(), StoreError> {
    if env == DEFAULT_ENV_DISPLAY {
        return Err(StoreError::ReservedEnvironmentName(env.to_string()));
    }
    Ok(())
}
