//! Integration tests module for the REST client
//!
//! Shared helpers for tests that talk to a local mock server and keep
//! project state in temporary directories.

pub mod flow_test;
pub mod property_test;
pub mod send_test;
pub mod workspace_test;

use restcli::models::RequestTemplate;
use restcli::variables::parse_var_scraper;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Builds a template with optional headers and captures.
pub fn template(
    name: &str,
    method: &str,
    url: &str,
    headers: &[(&str, &str)],
    captures: &[&str],
) -> RequestTemplate {
    let mut template = RequestTemplate::new(name, method, url);
    for (header, value) in headers {
        template.add_header(*header, *value);
    }
    for capture in captures {
        template.set_capture(parse_var_scraper(capture).expect("valid capture"));
    }
    template
}
