//! Per-send inputs.

use crate::models::{Body, Headers, RequestTemplate};
use crate::variables::{Scraper, VariableSet};
use std::path::PathBuf;

/// Everything a send needs besides the method, URL and transport settings.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Unresolved request headers.
    pub headers: Headers,
    /// Unresolved request body.
    pub body: Body,
    /// Values for variable references, keyed by canonical name.
    pub variables: VariableSet,
    /// Captures applied to the response, in order.
    pub scrapers: Vec<Scraper>,
    /// Oneshot state file to load before and save after the send.
    pub state_file: Option<PathBuf>,
}

impl SendOptions {
    /// Options for sending `template` with `variables`.
    pub fn for_template(template: &RequestTemplate, variables: VariableSet) -> Self {
        Self {
            headers: template.headers.clone(),
            body: template.body.clone(),
            variables,
            scrapers: template.captures.clone(),
            state_file: None,
        }
    }
}
