//! Oneshot state files.
//!
//! A state file lets standalone sends that are not part of a project share
//! cookies and captured variables across invocations.

use crate::cookies::CookieJar;
use crate::storage::{read_json, write_json, StorageError};
use crate::variables::canonical_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Contents of a oneshot state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneshotState {
    #[serde(default)]
    pub cookies: CookieJar,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl OneshotState {
    /// Loads the state at `path`; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let mut state: OneshotState = read_json(path)?.unwrap_or_default();
        state.variables = state
            .variables
            .into_iter()
            .map(|(name, value)| (canonical_name(&name), value))
            .collect();
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        write_json(path, self)
    }
}
