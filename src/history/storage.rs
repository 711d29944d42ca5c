//! Persistent storage for request history.
//!
//! History is a JSONL (JSON Lines) file: one entry per line, appended after
//! every send. A damaged line only loses that entry; loading skips it with a
//! warning and keeps going.

use super::models::{HistoryEntry, HistoryError};
use crate::config::ClientConfig;
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// A history file together with its retention settings.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,

    /// Maximum number of entries to keep in history.
    max_entries: usize,

    /// Whether to sanitize sensitive headers before storage.
    sanitize_sensitive_headers: bool,
}

impl HistoryLog {
    /// Creates a history log at `path`.
    pub fn new(path: impl Into<PathBuf>, max_entries: usize, sanitize_sensitive_headers: bool) -> Self {
        Self {
            path: path.into(),
            max_entries,
            sanitize_sensitive_headers,
        }
    }

    /// Creates a history log using the project's history settings.
    pub fn from_config(path: impl Into<PathBuf>, config: &ClientConfig) -> Self {
        Self::new(path, config.history_limit, config.sanitize_history)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an entry to the history file.
    ///
    /// The entry is sanitized and truncated according to the settings, then
    /// written as a single JSON line. The file is trimmed to the limit
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if:
    /// - The history file cannot be opened or created
    /// - The entry cannot be serialized to JSON
    /// - Writing to the file fails
    pub fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let prepared_entry = entry.clone().prepare_for_storage(self.sanitize_sensitive_headers);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(&prepared_entry)?;
        writeln!(file, "{}", json)?;
        file.flush()?;
        drop(file);

        debug!("Recorded history entry {}", prepared_entry.id);
        self.maintain_limit()?;
        Ok(())
    }

    /// Loads all history entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::StorageError` if the history file cannot be read.
    /// Individual line parsing errors are logged but don't cause the function to fail.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut corrupted_lines = 0;

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = match line_result {
                Ok(line) => line,
                Err(e) => {
                    corrupted_lines += 1;
                    warn!("Error reading history line {}: {}", line_num + 1, e);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    corrupted_lines += 1;
                    warn!(
                        "Skipping corrupted history entry at line {}: {}",
                        line_num + 1,
                        e
                    );
                }
            }
        }

        if corrupted_lines > 0 && corrupted_lines > entries.len() {
            warn!(
                "History file has significant corruption ({} corrupted lines, {} valid entries)",
                corrupted_lines,
                entries.len()
            );
        }

        Ok(entries)
    }

    /// Loads the most recent `count` entries, newest first.
    pub fn recent(&self, count: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries = self.load()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Removes the oldest entries beyond the limit.
    ///
    /// The kept entries are written to a temporary file which then replaces
    /// the history file.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn maintain_limit(&self) -> Result<usize, HistoryError> {
        let entries = self.load()?;
        if entries.len() <= self.max_entries {
            return Ok(0);
        }

        let entries_to_remove = entries.len() - self.max_entries;

        let temp_path = self.path.with_extension("jsonl.tmp");
        let mut temp_file = File::create(&temp_path)?;
        for entry in entries.iter().skip(entries_to_remove) {
            let json = serde_json::to_string(entry)?;
            writeln!(temp_file, "{}", json)?;
        }
        temp_file.flush()?;
        drop(temp_file);

        fs::rename(&temp_path, &self.path)?;
        debug!("Trimmed {} old history entries", entries_to_remove);

        Ok(entries_to_remove)
    }

    /// Deletes the history file. A missing file is not an error.
    pub fn clear(&self) -> Result<(), HistoryError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
