//! A single cookie and `Set-Cookie` parsing.
//!
//! Parsing follows the parts of RFC 6265 a command-line client needs:
//! domain and path scoping, `Secure`, `HttpOnly`, `Max-Age` and `Expires`.
//! Cookies without an expiry get a caller-supplied default lifetime instead
//! of living for the "session", since every invocation is its own session.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A cookie as stored in the jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,

    /// Lowercased domain without a leading dot.
    pub domain: String,

    /// `true` when the cookie had no `Domain` attribute and only matches the
    /// exact host that set it.
    #[serde(default)]
    pub host_only: bool,

    pub path: String,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,

    /// The cookie is expired at or after this instant.
    pub expires: DateTime<Utc>,
}

impl Cookie {
    /// Checks whether the cookie has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Checks whether the cookie should be sent to `url` at `now`.
    pub fn matches(&self, url: &Url, now: DateTime<Utc>) -> bool {
        if self.is_expired(now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };
        domain_ok && path_matches(url.path(), &self.path)
    }

    /// Identity used for replacement: a cookie replaces any earlier cookie
    /// with the same name, domain and path.
    pub fn same_identity(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Parses one `Set-Cookie` header value received from `request_url`.
///
/// # Arguments
///
/// * `header` - The raw header value
/// * `request_url` - URL of the request whose response carried the header
/// * `now` - Reference time for `Max-Age` and the default lifetime
/// * `default_lifetime` - Lifetime for cookies without `Max-Age`/`Expires`
///
/// # Returns
///
/// `None` when the header is malformed or names a domain the request host
/// may not set cookies for.
pub fn parse_set_cookie(
    header: &str,
    request_url: &Url,
    now: DateTime<Utc>,
    default_lifetime: Duration,
) -> Option<Cookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let host = request_url.host_str()?.to_ascii_lowercase();

    let mut domain = None;
    let mut path = None;
    let mut secure = false;
    let mut http_only = false;
    let mut max_age = None;
    let mut expires = None;

    for attribute in parts {
        let (key, attr_value) = match attribute.split_once('=') {
            Some((key, attr_value)) => (key.trim(), attr_value.trim()),
            None => (attribute.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "domain" => {
                let trimmed = attr_value.trim_start_matches('.').to_ascii_lowercase();
                if !trimmed.is_empty() {
                    domain = Some(trimmed);
                }
            }
            "path" if attr_value.starts_with('/') => path = Some(attr_value.to_string()),
            "secure" => secure = true,
            "httponly" => http_only = true,
            "max-age" => max_age = attr_value.parse::<i64>().ok(),
            "expires" => expires = parse_cookie_date(attr_value),
            _ => {}
        }
    }

    let (domain, host_only) = match domain {
        Some(domain) if domain_matches(&host, &domain) => (domain, false),
        Some(_) => return None,
        None => (host, true),
    };

    // Max-Age wins over Expires.
    let expires = match (max_age, expires) {
        (Some(seconds), _) if seconds <= 0 => now,
        (Some(seconds), _) => now
            .checked_add_signed(Duration::seconds(seconds))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        (None, Some(at)) => at,
        (None, None) => now
            .checked_add_signed(default_lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    };

    Some(Cookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        domain,
        host_only,
        path: path.unwrap_or_else(|| default_path(request_url.path())),
        secure,
        http_only,
        expires,
    })
}

fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Default cookie path for a request path (RFC 6265 section 5.1.4).
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => request_path[..index].to_string(),
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.ends_with(domain)
            && host[..host.len() - domain.len()].ends_with('.')
            && host.parse::<std::net::IpAddr>().is_err())
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}
