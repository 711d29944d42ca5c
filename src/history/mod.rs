//! Request history tracking and persistence.
//!
//! Every send made through a project is appended to a JSONL history file
//! next to the project file.
//!
//! # Features
//!
//! - JSONL format for efficient append operations
//! - Automatic history limit enforcement
//! - Sensitive header sanitization
//! - Large body truncation

pub mod models;
pub mod storage;

pub use models::{HistoryEntry, HistoryError, MAX_BODY_SIZE, SENSITIVE_HEADERS};
pub use storage::HistoryLog;
