//! Data models for request history.
//!
//! This module defines the core data structures for storing and managing
//! the history of sends.

use crate::models::{Body, HttpResponse, SendResult, SentRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum body size to store in history (1MB).
///
/// Bodies larger than this threshold are dropped from the stored entry
/// to prevent excessive storage usage.
pub const MAX_BODY_SIZE: usize = 1_048_576; // 1MB

/// Sensitive header names that should be sanitized before storage.
///
/// These headers contain authentication tokens, cookies, and other
/// sensitive information that should not be persisted by default.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "api-key",
    "auth-token",
    "x-auth-token",
    "access-token",
    "x-access-token",
    "proxy-authorization",
];

/// A single entry in the request history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier for this history entry.
    ///
    /// Generated using UUID v4 for guaranteed uniqueness.
    pub id: String,

    /// When the request was sent, in UTC.
    pub timestamp: DateTime<Utc>,

    /// Template that was sent, if the send came from a template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Flow the send was a step of, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    /// The request as sent. Sensitive headers may be sanitized.
    pub request: SentRequest,

    /// The response received. Large bodies (>1MB) are excluded.
    pub response: HttpResponse,

    /// Values captured from the response.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub captured: BTreeMap<String, String>,
}

impl HistoryEntry {
    /// Creates a new history entry from a send result.
    ///
    /// # Arguments
    ///
    /// * `result` - The result of the send
    /// * `template` - Name of the template that was sent
    /// * `flow` - Name of the flow the send belonged to
    ///
    /// # Returns
    ///
    /// A new `HistoryEntry` with a unique ID, stamped with the send time.
    pub fn from_result(result: &SendResult, template: Option<&str>, flow: Option<&str>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: result.sent_at,
            template: template.map(str::to_string),
            flow: flow.map(str::to_string),
            request: result.request.clone(),
            response: result.response.clone(),
            captured: result.captured.clone(),
        }
    }

    /// Checks if the request or response body exceeds the storage limit.
    pub fn has_large_body(&self) -> bool {
        self.request.body.len() > MAX_BODY_SIZE || self.response.body.len() > MAX_BODY_SIZE
    }

    /// Removes sensitive headers from the request and the response.
    ///
    /// # Arguments
    ///
    /// * `sanitize` - Whether to sanitize sensitive headers
    pub fn sanitize_headers(mut self, sanitize: bool) -> Self {
        if !sanitize {
            return self;
        }

        let is_public = |name: &str, _: &str| {
            !SENSITIVE_HEADERS
                .iter()
                .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
        };
        self.request.headers.retain(is_public);
        self.response.headers.retain(is_public);
        self
    }

    /// Drops bodies that exceed the size limit.
    pub fn truncate_large_bodies(mut self) -> Self {
        if self.request.body.len() > MAX_BODY_SIZE {
            self.request.body = Body::default();
        }
        if self.response.body.len() > MAX_BODY_SIZE {
            self.response.body = Body::default();
        }
        self
    }

    /// Prepares the entry for storage by sanitizing and truncating as needed.
    ///
    /// # Arguments
    ///
    /// * `sanitize_sensitive` - Whether to remove sensitive headers
    pub fn prepare_for_storage(self, sanitize_sensitive: bool) -> Self {
        self.sanitize_headers(sanitize_sensitive)
            .truncate_large_bodies()
    }

    /// One-line summary: "METHOD URL - STATUS (timestamp)".
    pub fn summary(&self) -> String {
        let source = match (&self.flow, &self.template) {
            (Some(flow), Some(template)) => format!(" [{} > {}]", flow, template),
            (None, Some(template)) => format!(" [{}]", template),
            _ => String::new(),
        };
        format!(
            "{} {} - {}{} ({})",
            self.request.method,
            self.request.url,
            self.response.status_line(),
            source,
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Errors that can occur during history operations.
#[derive(Debug)]
pub enum HistoryError {
    /// Error occurred during storage operations (file I/O).
    StorageError(std::io::Error),

    /// Error occurred during serialization or deserialization.
    SerializationError(serde_json::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::StorageError(err) => {
                write!(f, "History storage error: {}", err)
            }
            HistoryError::SerializationError(err) => {
                write!(f, "History serialization error: {}", err)
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::StorageError(err) => Some(err),
            HistoryError::SerializationError(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        HistoryError::StorageError(err)
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::SerializationError(err)
    }
}
