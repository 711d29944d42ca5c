//! Outcome of a single send.

use super::request::SentRequest;
use super::response::HttpResponse;
use crate::cookies::Cookie;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything observed while sending one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    /// The request as sent, after resolution.
    pub request: SentRequest,

    /// The response received.
    pub response: HttpResponse,

    /// When the request was issued.
    pub sent_at: DateTime<Utc>,

    /// When the complete response body had been read.
    pub received_at: DateTime<Utc>,

    /// Captured values by canonical variable name. Only captures that
    /// succeeded appear here.
    #[serde(default)]
    pub captured: BTreeMap<String, String>,

    /// Cookies set by the response, keyed by origin URL.
    #[serde(default)]
    pub cookies: BTreeMap<String, Vec<Cookie>>,
}
