//! Project files.
//!
//! A project is a single JSON file holding the configuration, the request
//! templates, the flows and the variable store:
//!
//! ```json
//! {
//!   "config": { "timeoutMs": 10000 },
//!   "templates": [{ "name": "login", "method": "POST", "url": "${BASE}/login" }],
//!   "flows": [{ "name": "smoke", "steps": ["login"] }],
//!   "variables": { "current": "", "environments": { "": { "BASE": "http://localhost" } } }
//! }
//! ```
//!
//! History and the cookie session live in sibling files named after the
//! project file: `api.json` keeps its history in `api.history.jsonl` and its
//! cookies in `api.session.json`.

use crate::config::{load_config, ClientConfig};
use crate::cookies::CookieJar;
use crate::environment::VariableStore;
use crate::flow::Flow;
use crate::models::{NamedSet, RequestTemplate};
use crate::storage::{read_json, write_json, StorageError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

/// An in-memory project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub config: ClientConfig,
    pub templates: NamedSet<RequestTemplate>,
    pub flows: NamedSet<Flow>,
    pub variables: VariableStore,
}

/// Borrowed view of a project, used to save while the store is borrowed
/// elsewhere.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProjectView<'a> {
    pub config: &'a ClientConfig,
    pub templates: &'a NamedSet<RequestTemplate>,
    pub flows: &'a NamedSet<Flow>,
    pub variables: &'a VariableStore,
}

impl ProjectView<'_> {
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        write_json(path, self)
    }
}

#[derive(Deserialize)]
struct ProjectFile {
    #[serde(default)]
    config: Option<Value>,
    #[serde(default)]
    templates: NamedSet<RequestTemplate>,
    #[serde(default)]
    flows: NamedSet<Flow>,
    #[serde(default)]
    variables: VariableStore,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the project at `path`.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let file: ProjectFile = read_json(path)?.ok_or_else(|| {
            StorageError::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "project file not found"),
            )
        })?;

        let config = load_config(file.config).map_err(|message| StorageError::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(Self {
            config,
            templates: file.templates,
            flows: file.flows,
            variables: file.variables,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        self.view().save(path)
    }

    pub fn view(&self) -> ProjectView<'_> {
        ProjectView {
            config: &self.config,
            templates: &self.templates,
            flows: &self.flows,
            variables: &self.variables,
        }
    }
}

/// History file belonging to the project at `project_path`.
pub fn history_path(project_path: &Path) -> PathBuf {
    sibling(project_path, "history.jsonl")
}

/// Session (cookie jar) file belonging to the project at `project_path`.
pub fn session_path(project_path: &Path) -> PathBuf {
    sibling(project_path, "session.json")
}

fn sibling(project_path: &Path, suffix: &str) -> PathBuf {
    let stem = project_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    project_path.with_file_name(format!("{}.{}", stem, suffix))
}

/// Loads a session jar, dropping cookies that have expired since it was saved.
pub fn load_session(path: &Path) -> Result<CookieJar, StorageError> {
    let mut jar: CookieJar = read_json(path)?.unwrap_or_default();
    jar.purge_expired(Utc::now());
    Ok(jar)
}

pub fn save_session(path: &Path, jar: &CookieJar) -> Result<(), StorageError> {
    write_json(path, jar)
}
