//! Errors raised while sending a request.
//!
//! [`RequestError`] describes what went wrong at the transport level.
//! [`SendError`] is what [`crate::executor::send`] returns: it says at which
//! stage of a send the failure happened and, for capture failures, still
//! carries everything that was received.

use crate::models::SendResult;
use crate::storage::StorageError;
use crate::variables::CaptureError;
use std::fmt;

/// Transport-level request errors.
#[derive(Debug)]
pub enum RequestError {
    /// Connection failures, DNS resolution errors and other network-level issues.
    NetworkError(String),

    /// Request took longer than the configured timeout.
    Timeout,

    /// The URL could not be parsed.
    InvalidUrl(String),

    /// Certificate validation or handshake failure.
    TlsError(String),

    /// Invalid headers, malformed responses, redirect loops.
    ProtocolError(String),

    /// The HTTP client or request could not be constructed.
    BuildError(String),

    /// Only HTTP and HTTPS are supported.
    UnsupportedProtocol(String),

    /// The method is not a valid HTTP token.
    InvalidMethod(String),

    /// A header name or value cannot be sent.
    InvalidHeader(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            RequestError::Timeout => write!(f, "Request timed out"),
            RequestError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            RequestError::TlsError(msg) => write!(f, "TLS/SSL error: {}", msg),
            RequestError::ProtocolError(msg) => write!(f, "HTTP protocol error: {}", msg),
            RequestError::BuildError(msg) => write!(f, "Request build error: {}", msg),
            RequestError::UnsupportedProtocol(protocol) => {
                write!(f, "Unsupported protocol: {}", protocol)
            }
            RequestError::InvalidMethod(method) => write!(f, "Invalid HTTP method: {}", method),
            RequestError::InvalidHeader(msg) => write!(f, "Invalid header: {}", msg),
        }
    }
}

impl std::error::Error for RequestError {}

/// Convert reqwest errors to RequestError.
impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        let detail = format!("{:?}", err);
        if err.is_timeout() {
            RequestError::Timeout
        } else if detail.contains("certificate") || detail.contains("Tls") || detail.contains("SSL") {
            RequestError::TlsError(message)
        } else if err.is_redirect() || err.is_decode() || err.is_body() {
            RequestError::ProtocolError(message)
        } else if err.is_builder() {
            RequestError::BuildError(message)
        } else {
            RequestError::NetworkError(message)
        }
    }
}

/// Convert URL parsing errors to RequestError.
impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrl(err.to_string())
    }
}

/// Errors returned by a send.
#[derive(Debug)]
pub enum SendError {
    /// A variable referenced in `field` (the URL, a header or the body) has
    /// no value.
    UnresolvedVariable { field: String, name: String },

    /// The resolved request cannot be sent (bad URL, method or header).
    InvalidRequest(RequestError),

    /// The transport failed; no response was received.
    RequestFailed(RequestError),

    /// A response arrived but a capture could not be applied.
    ///
    /// `result` holds the request, the response and the captures that
    /// succeeded before the failing one.
    CaptureFailed {
        var: String,
        source: CaptureError,
        result: Box<SendResult>,
    },

    /// The oneshot state file could not be read or written.
    State(StorageError),
}

impl SendError {
    /// The partial result when a response was received.
    pub fn response(&self) -> Option<&SendResult> {
        match self {
            SendError::CaptureFailed { result, .. } => Some(result),
            _ => None,
        }
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::UnresolvedVariable { field, name } => {
                write!(f, "Undefined variable '{}' in {}", name, field)
            }
            SendError::InvalidRequest(err) => write!(f, "Invalid request: {}", err),
            SendError::RequestFailed(err) => write!(f, "Request failed: {}", err),
            SendError::CaptureFailed { var, source, .. } => {
                write!(f, "Capture of {} failed: {}", var, source)
            }
            SendError::State(err) => write!(f, "State file error: {}", err),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::InvalidRequest(err) | SendError::RequestFailed(err) => Some(err),
            SendError::CaptureFailed { source, .. } => Some(source),
            SendError::State(err) => Some(err),
            SendError::UnresolvedVariable { .. } => None,
        }
    }
}

impl From<StorageError> for SendError {
    fn from(err: StorageError) -> Self {
        SendError::State(err)
    }
}
