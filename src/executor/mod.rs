//! Request sender.
//!
//! [`send`] takes an unresolved request, resolves its variable references,
//! attaches cookies, performs the exchange, applies captures and stores the
//! cookies set by the response. One request is in flight at a time and
//! nothing is retried.

pub mod config;
pub mod error;
pub mod options;
pub mod state;
mod transport;

pub use config::ExecutionConfig;
pub use error::{RequestError, SendError};
pub use options::SendOptions;
pub use state::OneshotState;

use crate::cookies::{origin_of, CookieJar};
use crate::models::{Body, Headers, RequestTemplate, SendResult, SentRequest};
use crate::variables::{resolve, resolve_bytes, VarError, VariableSet};
use chrono::Utc;
use log::debug;
use std::collections::BTreeMap;
use url::Url;

/// Sends one request.
///
/// Steps, in order:
///
/// 1. Resolve the URL, header values and body against `options.variables`.
/// 2. Attach default headers and matching cookies from `jar`.
/// 3. Perform the exchange.
/// 4. Apply `options.scrapers` in order.
/// 5. Merge `Set-Cookie` headers from the response into `jar`.
///
/// When `options.state_file` is set, its variables fill names missing from
/// `options.variables` and its cookies are merged into `jar` before step 1.
/// After step 5 the jar and the captured values are written back to it.
///
/// # Arguments
///
/// * `method` - HTTP method token
/// * `url` - Unresolved URL
/// * `prefix` - Variable reference prefix
/// * `options` - Headers, body, variables, captures and state file
/// * `jar` - Cookie jar read before and updated after the exchange
/// * `config` - Transport settings
///
/// # Returns
///
/// The [`SendResult`], or a [`SendError`] naming the stage that failed. A
/// capture failure carries the partial result and leaves the jar untouched.
///
/// # Examples
///
/// ```no_run
/// use restcli::cookies::CookieJar;
/// use restcli::executor::{send, ExecutionConfig, SendOptions};
/// use restcli::variables::variable_set;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = SendOptions {
///     variables: variable_set([("host", "httpbin.org")]),
///     ..Default::default()
/// };
/// let mut jar = CookieJar::new();
/// let result = send("GET", "https://$host/get", "$", &options, &mut jar, &ExecutionConfig::default())?;
/// println!("Status: {}", result.response.status_code);
/// # Ok(())
/// # }
/// ```
pub fn send(
    method: &str,
    url: &str,
    prefix: &str,
    options: &SendOptions,
    jar: &mut CookieJar,
    config: &ExecutionConfig,
) -> Result<SendResult, SendError> {
    let mut state = match &options.state_file {
        Some(path) => Some(OneshotState::load(path)?),
        None => None,
    };

    let mut variables = options.variables.clone();
    if let Some(state) = state.as_mut() {
        for (name, value) in &state.variables {
            variables
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        jar.absorb(std::mem::take(&mut state.cookies), Utc::now());
    }

    let mut request = resolve_request(method, url, prefix, options, &variables)?;
    let parsed_url = validate_url(&request.url).map_err(SendError::InvalidRequest)?;
    let http_method = transport::parse_method(&request.method).map_err(SendError::InvalidRequest)?;

    for (name, value) in config.default_headers.iter() {
        if !request.headers.contains(name) {
            request.headers.insert(name, value);
        }
    }
    if let Some(cookies) = jar.cookie_header(&parsed_url, Utc::now()) {
        let value = match request.headers.get("cookie") {
            Some(existing) => format!("{}; {}", existing, cookies),
            None => cookies,
        };
        request.headers.set("Cookie", value);
    }
    let header_map = transport::header_map(&request.headers).map_err(SendError::InvalidRequest)?;
    let client = transport::build_client(config).map_err(SendError::InvalidRequest)?;

    debug!("Sending {} {}", request.method, request.url);
    let sent_at = Utc::now();
    let response = transport::execute(
        &client,
        http_method,
        &parsed_url,
        header_map,
        request.body.as_bytes(),
    )
    .map_err(SendError::RequestFailed)?;
    let received_at = Utc::now();
    debug!(
        "Received {} from {} in {:?}",
        response.status_line(),
        request.url,
        response.duration
    );

    let mut result = SendResult {
        request,
        response,
        sent_at,
        received_at,
        captured: BTreeMap::new(),
        cookies: BTreeMap::new(),
    };

    for scraper in &options.scrapers {
        match scraper.apply(result.response.body.as_bytes()) {
            Ok(value) => {
                debug!("Captured {} = {:?}", scraper.var_name, value);
                result.captured.insert(scraper.var_name.clone(), value);
            }
            Err(source) => {
                return Err(SendError::CaptureFailed {
                    var: scraper.var_name.clone(),
                    source,
                    result: Box::new(result),
                })
            }
        }
    }

    let accepted = jar.store_response_cookies(
        &parsed_url,
        &result.response.headers,
        received_at,
        config.cookie_lifetime,
    );
    if !accepted.is_empty() {
        result.cookies.insert(origin_of(&parsed_url), accepted);
    }

    if let (Some(path), Some(mut state)) = (&options.state_file, state) {
        state.cookies = jar.clone();
        state
            .variables
            .extend(result.captured.iter().map(|(k, v)| (k.clone(), v.clone())));
        state.save(path)?;
        debug!("Saved state to {}", path.display());
    }

    Ok(result)
}

/// Sends a template with the given variable values.
pub fn send_template(
    template: &RequestTemplate,
    variables: VariableSet,
    prefix: &str,
    jar: &mut CookieJar,
    config: &ExecutionConfig,
) -> Result<SendResult, SendError> {
    let options = SendOptions::for_template(template, variables);
    send(&template.method, &template.url, prefix, &options, jar, config)
}

/// Resolves every variable reference of a request, without sending it.
fn resolve_request(
    method: &str,
    url: &str,
    prefix: &str,
    options: &SendOptions,
    variables: &VariableSet,
) -> Result<SentRequest, SendError> {
    let url = resolve(url, variables, prefix).map_err(|e| unresolved("URL", e))?;

    let mut headers = Headers::new();
    for (name, value) in options.headers.iter() {
        let value = resolve(value, variables, prefix)
            .map_err(|e| unresolved(&format!("header {}", name), e))?;
        headers.insert(name, value);
    }

    let body = resolve_bytes(options.body.as_bytes(), variables, prefix)
        .map_err(|e| unresolved("body", e))?;

    Ok(SentRequest {
        method: method.trim().to_ascii_uppercase(),
        url: url.trim().to_string(),
        headers,
        body: Body::new(body),
    })
}

fn unresolved(field: &str, err: VarError) -> SendError {
    SendError::UnresolvedVariable {
        field: field.to_string(),
        name: err.name().to_string(),
    }
}

/// Validates that the URL is well-formed and uses a supported protocol.
///
/// # Arguments
///
/// * `url` - The URL string to validate
///
/// # Returns
///
/// The parsed URL, or `Err(RequestError)` if invalid.
fn validate_url(url: &str) -> Result<Url, RequestError> {
    let parsed = Url::parse(url)?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(RequestError::UnsupportedProtocol(format!(
            "Only HTTP and HTTPS are supported, got: {}",
            scheme
        )));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::variable_set;

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("http://example.com:8080/path").is_ok());
        assert!(validate_url("https://api.example.com/v1/users").is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
        assert!(validate_url("://missing-scheme").is_err());
    }

    #[test]
    fn test_validate_url_unsupported_protocol() {
        match validate_url("ftp://example.com") {
            Err(RequestError::UnsupportedProtocol(msg)) => assert!(msg.contains("ftp")),
            other => panic!("Expected UnsupportedProtocol error, got {:?}", other),
        }
    }

    fn options_with(headers: &[(&str, &str)], body: &str) -> SendOptions {
        SendOptions {
            headers: headers.iter().copied().collect(),
            body: Body::from(body),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_request() {
        let vars = variable_set([("host", "example.com"), ("token", "t0k"), ("id", "7")]);
        let options = options_with(&[("Authorization", "Bearer ${TOKEN}")], r#"{"id": $id}"#);

        let request = resolve_request(" post ", "https://$host/items", "$", &options, &vars).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://example.com/items");
        assert_eq!(request.headers.get("authorization"), Some("Bearer t0k"));
        assert_eq!(request.body.as_text(), Some(r#"{"id": 7}"#));
    }

    #[test]
    fn test_resolve_request_reports_field() {
        let vars = variable_set([("host", "example.com")]);

        let err = resolve_request("GET", "http://$host/$missing", "$", &SendOptions::default(), &vars)
            .unwrap_err();
        assert!(matches!(
            err,
            SendError::UnresolvedVariable { ref field, ref name } if field == "URL" && name == "MISSING"
        ));

        let options = options_with(&[("X-Token", "${TOKEN}")], "");
        let err = resolve_request("GET", "http://$host", "$", &options, &vars).unwrap_err();
        assert!(matches!(
            err,
            SendError::UnresolvedVariable { ref field, .. } if field == "header X-Token"
        ));

        let options = options_with(&[], "$nope");
        let err = resolve_request("GET", "http://$host", "$", &options, &vars).unwrap_err();
        assert!(matches!(
            err,
            SendError::UnresolvedVariable { ref field, .. } if field == "body"
        ));
    }

    #[test]
    fn test_resolve_request_custom_prefix() {
        let vars = variable_set([("host", "example.com")]);
        let request =
            resolve_request("GET", "http://@host/$literal", "@", &SendOptions::default(), &vars).unwrap();
        assert_eq!(request.url, "http://example.com/$literal");
    }

    #[test]
    fn test_send_rejects_unresolved_before_network() {
        let mut jar = CookieJar::new();
        let err = send(
            "GET",
            "http://${HOST}/",
            "$",
            &SendOptions::default(),
            &mut jar,
            &ExecutionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SendError::UnresolvedVariable { .. }));
    }

    #[test]
    fn test_send_rejects_unsupported_scheme() {
        let mut jar = CookieJar::new();
        let err = send(
            "GET",
            "ftp://example.com/",
            "$",
            &SendOptions::default(),
            &mut jar,
            &ExecutionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SendError::InvalidRequest(RequestError::UnsupportedProtocol(_))
        ));
    }
}
