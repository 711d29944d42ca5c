//! Blocking HTTP transport built on reqwest.

use super::config::ExecutionConfig;
use super::error::RequestError;
use crate::models::{Body, Headers, HttpResponse};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Method;
use std::time::Instant;
use url::Url;

/// Builds a client honoring the timeout, redirect and TLS settings.
///
/// The client keeps no cookies of its own; the jar is managed by the sender.
pub(crate) fn build_client(config: &ExecutionConfig) -> Result<Client, RequestError> {
    let redirect = if config.follow_redirects {
        Policy::limited(config.max_redirects as usize)
    } else {
        Policy::none()
    };

    Client::builder()
        .timeout(config.timeout)
        .redirect(redirect)
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(|e| RequestError::BuildError(e.to_string()))
}

/// Parses a method token such as `GET` or a custom `PURGE`.
pub(crate) fn parse_method(method: &str) -> Result<Method, RequestError> {
    Method::from_bytes(method.as_bytes()).map_err(|_| RequestError::InvalidMethod(method.to_string()))
}

/// Converts headers into a reqwest map, keeping repeated names.
pub(crate) fn header_map(headers: &Headers) -> Result<HeaderMap, RequestError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RequestError::InvalidHeader(format!("bad header name '{}'", name)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| RequestError::InvalidHeader(format!("bad value for header '{}'", name)))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

/// Performs one exchange and reads the complete body.
pub(crate) fn execute(
    client: &Client,
    method: Method,
    url: &Url,
    headers: HeaderMap,
    body: &[u8],
) -> Result<HttpResponse, RequestError> {
    let mut builder = client.request(method, url.clone()).headers(headers);
    if !body.is_empty() {
        builder = builder.body(body.to_vec());
    }

    let start_time = Instant::now();
    let response = builder.send()?;

    let status = response.status();
    let mut http_response = HttpResponse::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
    );
    for (name, value) in response.headers() {
        http_response.add_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    let bytes = response.bytes()?;
    http_response.body = Body::new(bytes.to_vec());
    http_response.duration = start_time.elapsed();

    Ok(http_response)
}
