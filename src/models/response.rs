//! HTTP response data models.

use super::body::Body;
use super::headers::Headers;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Represents an HTTP response received from a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status_code: u16,

    /// HTTP status text (e.g., "OK", "Not Found").
    pub status_text: String,

    /// Response headers, in the order received.
    pub headers: Headers,

    /// Response body as raw bytes.
    pub body: Body,

    /// Time from sending the request to receiving the complete body.
    pub duration: Duration,
}

impl HttpResponse {
    /// Creates a new HttpResponse with the given status.
    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            headers: Headers::new(),
            body: Body::default(),
            duration: Duration::ZERO,
        }
    }

    /// Checks if the response indicates success (2xx status code).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Checks if the response is a redirect (3xx status code).
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// Checks if the response indicates a client error (4xx status code).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// Checks if the response indicates a server error (5xx status code).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// Gets the Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Response body as text, if it is valid UTF-8.
    pub fn body_as_text(&self) -> Option<&str> {
        self.body.as_text()
    }

    /// Adds a header to the response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the response body.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Status line as `200 OK`.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.status_code, self.status_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(HttpResponse::new(204, "No Content").is_success());
        assert!(HttpResponse::new(302, "Found").is_redirect());
        assert!(HttpResponse::new(404, "Not Found").is_client_error());
        assert!(HttpResponse::new(503, "Service Unavailable").is_server_error());
        assert!(!HttpResponse::new(404, "Not Found").is_success());
    }

    #[test]
    fn test_content_type_and_body() {
        let mut response = HttpResponse::new(200, "OK");
        response.add_header("content-type", "application/json");
        response.set_body(r#"{"ok":true}"#);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body_as_text(), Some(r#"{"ok":true}"#));
        assert_eq!(response.status_line(), "200 OK");
    }
}
