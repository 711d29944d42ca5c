//! JSON file persistence shared by the project, session and state files.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while reading or writing state files.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error while accessing a file.
    Io { path: PathBuf, source: io::Error },

    /// The file exists but does not hold the expected JSON.
    Serialization { path: PathBuf, message: String },

    /// The file parsed but holds an invalid configuration.
    InvalidConfig { path: PathBuf, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            StorageError::Serialization { path, message } => {
                write!(f, "Malformed file {}: {}", path.display(), message)
            }
            StorageError::InvalidConfig { path, message } => {
                write!(f, "{} in {}", message, path.display())
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn serialization(path: &Path, err: serde_json::Error) -> Self {
        StorageError::Serialization {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Reads a JSON file. A missing file yields `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::serialization(path, e))
}

/// Writes `value` as pretty JSON.
///
/// The data goes to a sibling temporary file first and is then renamed over
/// the target, so an interrupted write leaves the previous file intact.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::serialization(path, e))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, json).map_err(|e| StorageError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| StorageError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<BTreeMap<String, String>> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut value = BTreeMap::new();
        value.insert("TOKEN".to_string(), "abc".to_string());

        write_json(&path, &value).unwrap();
        let back: BTreeMap<String, String> = read_json(&path).unwrap().unwrap();
        assert_eq!(back, value);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let result: Result<Option<BTreeMap<String, String>>, _> = read_json(&path);
        assert!(matches!(result, Err(StorageError::Serialization { .. })));
    }
}
