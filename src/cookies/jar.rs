//! Cookie jar persisted between invocations.
//!
//! Entries are grouped by the origin URL that set them (the request URL
//! without query or fragment) and remember when they were last updated.

use super::cookie::{parse_set_cookie, Cookie};
use crate::models::Headers;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

/// Cookies set by responses from one origin URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarEntry {
    pub origin: String,
    pub cookies: Vec<Cookie>,
    pub captured_at: DateTime<Utc>,
}

/// All cookies known to a project session or oneshot state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    entries: Vec<JarEntry>,
}

/// Origin key for a request URL.
pub fn origin_of(url: &Url) -> String {
    let mut origin = url.clone();
    origin.set_query(None);
    origin.set_fragment(None);
    origin.to_string()
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[JarEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of stored cookies, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.cookies.len()).sum()
    }

    /// Stores `cookies` as set by a response to `url`.
    ///
    /// Each cookie replaces any stored cookie with the same name, domain and
    /// path, whichever origin set it. Cookies that are already expired only
    /// remove their predecessor.
    pub fn merge(&mut self, url: &Url, cookies: Vec<Cookie>, now: DateTime<Utc>) {
        let origin = origin_of(url);
        for cookie in cookies {
            self.insert(&origin, cookie, now);
        }
        self.entries.retain(|entry| !entry.cookies.is_empty());
    }

    /// Parses every `Set-Cookie` header in `headers` and merges the result.
    ///
    /// Returns the cookies that were accepted, including ones that delete
    /// an earlier cookie by expiring immediately.
    pub fn store_response_cookies(
        &mut self,
        url: &Url,
        headers: &Headers,
        now: DateTime<Utc>,
        default_lifetime: Duration,
    ) -> Vec<Cookie> {
        let mut accepted = Vec::new();
        for header in headers.get_all("set-cookie") {
            match parse_set_cookie(header, url, now, default_lifetime) {
                Some(cookie) => accepted.push(cookie),
                None => warn!("Ignoring unusable Set-Cookie header from {}: {}", url, header),
            }
        }
        if !accepted.is_empty() {
            debug!("Storing {} cookie(s) from {}", accepted.len(), url);
            self.merge(url, accepted.clone(), now);
        }
        accepted
    }

    /// Cookies to send to `url` at `now`, longest path first.
    pub fn cookies_for_url_at(&self, url: &Url, now: DateTime<Utc>) -> Vec<&Cookie> {
        let mut matching: Vec<&Cookie> = self
            .entries
            .iter()
            .flat_map(|entry| entry.cookies.iter())
            .filter(|cookie| cookie.matches(url, now))
            .collect();
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
    }

    /// Cookies to send to `url` right now.
    pub fn cookies_for_url(&self, url: &Url) -> Vec<&Cookie> {
        self.cookies_for_url_at(url, Utc::now())
    }

    /// Value for a `Cookie` request header, if any cookie matches.
    pub fn cookie_header(&self, url: &Url, now: DateTime<Utc>) -> Option<String> {
        let cookies = self.cookies_for_url_at(url, now);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|cookie| cookie.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Drops expired cookies and returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.len();
        for entry in &mut self.entries {
            entry.cookies.retain(|cookie| !cookie.is_expired(now));
        }
        self.entries.retain(|entry| !entry.cookies.is_empty());
        before - self.len()
    }

    /// Merges every cookie of `other` into this jar, keeping its origins.
    pub fn absorb(&mut self, other: CookieJar, now: DateTime<Utc>) {
        for entry in other.entries {
            for cookie in entry.cookies {
                self.insert(&entry.origin, cookie, now);
            }
        }
        self.entries.retain(|entry| !entry.cookies.is_empty());
    }

    fn insert(&mut self, origin: &str, cookie: Cookie, now: DateTime<Utc>) {
        for entry in &mut self.entries {
            entry.cookies.retain(|existing| !existing.same_identity(&cookie));
        }
        if cookie.is_expired(now) {
            return;
        }
        match self.entries.iter_mut().find(|entry| entry.origin == origin) {
            Some(entry) => {
                entry.cookies.push(cookie);
                entry.captured_at = now;
            }
            None => self.entries.push(JarEntry {
                origin: origin.to_string(),
                cookies: vec![cookie],
                captured_at: now,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn set_cookies(jar: &mut CookieJar, request_url: &str, lines: &[&str], lifetime: Duration) -> Vec<Cookie> {
        let headers: Headers = lines.iter().map(|line| ("Set-Cookie", *line)).collect();
        jar.store_response_cookies(&url(request_url), &headers, now(), lifetime)
    }

    #[test]
    fn test_origin_strips_query_and_fragment() {
        assert_eq!(
            origin_of(&url("http://example.com/login?next=/home#top")),
            "http://example.com/login"
        );
    }

    #[test]
    fn test_store_and_send_cookies() {
        let mut jar = CookieJar::new();
        let accepted = set_cookies(
            &mut jar,
            "http://example.com/login?x=1",
            &["sid=abc; Path=/", "pref=dark; Path=/app", "broken"],
            Duration::days(1),
        );

        assert_eq!(accepted.len(), 2);
        assert_eq!(jar.entries().len(), 1);
        assert_eq!(jar.entries()[0].origin, "http://example.com/login");
        assert_eq!(
            jar.cookie_header(&url("http://example.com/app/page"), now()),
            Some("pref=dark; sid=abc".to_string())
        );
        assert_eq!(
            jar.cookie_header(&url("http://example.com/other"), now()),
            Some("sid=abc".to_string())
        );
        assert_eq!(jar.cookie_header(&url("http://example.org/"), now()), None);
    }

    #[test]
    fn test_replacement_across_origins() {
        let mut jar = CookieJar::new();
        set_cookies(&mut jar, "http://example.com/a", &["sid=1; Path=/"], Duration::days(1));
        set_cookies(&mut jar, "http://example.com/b", &["sid=2; Path=/"], Duration::days(1));

        assert_eq!(jar.len(), 1);
        assert_eq!(jar.entries()[0].origin, "http://example.com/b");
        assert_eq!(
            jar.cookie_header(&url("http://example.com/"), now()),
            Some("sid=2".to_string())
        );
    }

    #[test]
    fn test_expired_cookie_deletes_predecessor() {
        let mut jar = CookieJar::new();
        set_cookies(&mut jar, "http://example.com/", &["sid=1"], Duration::days(1));
        set_cookies(&mut jar, "http://example.com/", &["sid=; Max-Age=0"], Duration::days(1));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_default_lifetime_elapses() {
        let mut jar = CookieJar::new();
        set_cookies(&mut jar, "http://example.com/", &["sid=1"], Duration::seconds(60));

        let target = url("http://example.com/");
        assert_eq!(jar.cookies_for_url_at(&target, now() + Duration::seconds(59)).len(), 1);
        assert!(jar.cookies_for_url_at(&target, now() + Duration::seconds(61)).is_empty());

        assert_eq!(jar.purge_expired(now() + Duration::seconds(61)), 1);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_absorb() {
        let mut session = CookieJar::new();
        set_cookies(&mut session, "http://example.com/", &["a=1", "b=1"], Duration::days(1));
        let mut state = CookieJar::new();
        set_cookies(&mut state, "http://example.com/x", &["b=2; Path=/"], Duration::days(1));

        session.absorb(state, now());
        assert_eq!(
            session.cookie_header(&url("http://example.com/"), now()),
            Some("a=1; b=2".to_string())
        );
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut jar = CookieJar::new();
        set_cookies(&mut jar, "https://example.com/", &["a=1; Secure"], Duration::days(1));
        let json = serde_json::to_string(&jar).unwrap();
        let back: CookieJar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, jar);
    }
}
