//! HTTP request data models.
//!
//! A [`RequestTemplate`] is a named, reusable request definition whose URL,
//! header values and body may reference variables. A [`SentRequest`] is what
//! actually went on the wire after resolution.

use super::body::Body;
use super::collection::Named;
use super::headers::Headers;
use crate::variables::{referenced_variables, Scraper};
use serde::{Deserialize, Serialize};

/// A named, reusable request definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Unique name within the project; compared case-insensitively.
    pub name: String,

    /// HTTP method (GET, POST, ...). Any token is accepted, so custom
    /// methods work as well.
    #[serde(default)]
    pub method: String,

    /// Target URL; may contain variable references.
    #[serde(default)]
    pub url: String,

    /// Request headers; values may contain variable references.
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,

    /// Request body; may contain variable references.
    #[serde(default, skip_serializing_if = "<[u8]>::is_empty")]
    pub body: Body,

    /// Captures applied to the response, in order. At most one per variable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<Scraper>,

    /// Flow to run before this template when it is sent on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_flow: Option<String>,
}

impl RequestTemplate {
    /// Creates a template with the given name, method and URL.
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// A template can be sent once it has both a method and a URL.
    pub fn is_sendable(&self) -> bool {
        !self.method.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// Adds a header line.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the request body.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Adds a capture, replacing any existing capture for the same variable.
    pub fn set_capture(&mut self, scraper: Scraper) {
        match self
            .captures
            .iter_mut()
            .find(|existing| existing.var_name == scraper.var_name)
        {
            Some(existing) => *existing = scraper,
            None => self.captures.push(scraper),
        }
    }

    /// Canonical names referenced by the URL, header values and body, in
    /// order of first use.
    pub fn referenced_variables(&self, prefix: &str) -> Vec<String> {
        let body = String::from_utf8_lossy(self.body.as_bytes());
        let mut names = referenced_variables(&self.url, prefix);
        let texts = self
            .headers
            .iter()
            .map(|(_, value)| value)
            .chain(std::iter::once(body.as_ref()));
        for text in texts {
            for name in referenced_variables(text, prefix) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Removes the capture for `var_name`. Returns `true` if one existed.
    pub fn remove_capture(&mut self, var_name: &str) -> bool {
        let before = self.captures.len();
        self.captures
            .retain(|scraper| !scraper.var_name.eq_ignore_ascii_case(var_name));
        before != self.captures.len()
    }
}

impl Named for RequestTemplate {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A request as it was actually sent, after variable resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentRequest {
    /// HTTP method, uppercased.
    pub method: String,
    /// Fully resolved URL.
    pub url: String,
    /// Headers as sent, including attached cookies and default headers.
    pub headers: Headers,
    /// Body as sent.
    #[serde(default)]
    pub body: Body,
}
