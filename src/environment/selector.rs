//! Environment selection for commands that act on "which environment".

use super::store::{display_env_name, StoreError, VariableStore, DEFAULT_ENV};
use std::fmt;

/// Which environment(s) an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvSelector {
    /// Whatever environment is current (possibly the default).
    #[default]
    Current,
    /// A specific non-default environment.
    Named(String),
    /// The default environment.
    Default,
    /// Every environment, the default included.
    All,
}

impl EnvSelector {
    /// Concrete environment names this selector covers in `store`.
    ///
    /// For [`EnvSelector::All`] the default comes first, followed by the
    /// user environments in sorted order.
    pub fn targets(&self, store: &VariableStore) -> Vec<String> {
        match self {
            EnvSelector::Current => vec![store.current().to_string()],
            EnvSelector::Named(env) => vec![env.clone()],
            EnvSelector::Default => vec![DEFAULT_ENV.to_string()],
            EnvSelector::All => {
                let mut targets = vec![DEFAULT_ENV.to_string()];
                targets.extend(store.environment_names());
                targets
            }
        }
    }

    /// Sets `name` in every targeted environment.
    pub fn set(&self, store: &mut VariableStore, name: &str, value: &str) -> Result<(), StoreError> {
        for env in self.targets(store) {
            store.set_in(name, value, &env)?;
        }
        Ok(())
    }

    /// Unsets `name` in every targeted environment and returns the
    /// environments it was removed from.
    pub fn unset(&self, store: &mut VariableStore, name: &str) -> Vec<String> {
        self.targets(store)
            .into_iter()
            .filter(|env| store.unset_in(name, env))
            .collect()
    }

    /// Deletes the targeted environment(s) and returns what was deleted.
    ///
    /// Deleting the default environment alone is refused; deleting the
    /// current environment while it is the default is ambiguous and refused
    /// as well. Both cases require [`EnvSelector::All`].
    pub fn delete(&self, store: &mut VariableStore) -> Result<Vec<String>, StoreError> {
        match self {
            EnvSelector::Current if store.current() == DEFAULT_ENV => {
                Err(StoreError::AmbiguousDefaultDeletion)
            }
            EnvSelector::Current => {
                let env = store.current().to_string();
                store.delete_env(&env)?;
                Ok(vec![env])
            }
            EnvSelector::Named(env) => {
                store.delete_env(env)?;
                Ok(vec![env.clone()])
            }
            EnvSelector::Default => Err(StoreError::CannotDeleteDefault),
            EnvSelector::All => {
                let deleted = self.targets(store);
                store.delete_all();
                Ok(deleted)
            }
        }
    }
}

impl fmt::Display for EnvSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvSelector::Current => write!(f, "current environment"),
            EnvSelector::Named(env) => write!(f, "environment '{}'", display_env_name(env)),
            EnvSelector::Default => write!(f, "default environment"),
            EnvSelector::All => write!(f, "all environments"),
        }
    }
}
