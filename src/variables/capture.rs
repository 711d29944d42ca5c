//! Capture specifications for extracting variables from HTTP responses.
//!
//! A capture (or "scraper") binds a variable name to a rule that pulls a
//! value out of a response body. Two rule shapes exist:
//!
//! ```text
//! token:auth.access_token      JSON path: object keys and array indexes
//! first_id:items[0].id
//! prefix::0,8                  byte range [0, 8) of the raw body
//! rest::8                      byte range from 8 to the end of the body
//! ```
//!
//! The part after the variable name is the *spec*; [`Scraper::spec`]
//! renders it back in canonical form.

use super::{canonical_name, is_valid_variable_name};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// One step of a JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Object member lookup.
    Key(String),
    /// Array element lookup.
    Index(usize),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => write!(f, ".{}", key),
            PathStep::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// The extraction rule of a [`Scraper`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScrapeKind {
    /// Raw body bytes `start..end`; `end: None` means the rest of the body.
    Offset { start: usize, end: Option<usize> },
    /// JSON traversal from the document root.
    Path(Vec<PathStep>),
}

/// A parsed capture specification bound to a target variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scraper {
    /// Canonical (uppercase) name of the variable receiving the value.
    pub var_name: String,
    /// How the value is extracted.
    pub kind: ScrapeKind,
}

/// Errors from parsing or applying capture specifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The spec part (after `VAR:`) is malformed.
    InvalidCaptureSpec { spec: String, reason: String },

    /// The full `VAR:SPEC` argument is malformed.
    InvalidCaptureArgument { argument: String, reason: String },

    /// Byte offsets reach past the end of the body.
    CaptureOutOfRange {
        start: usize,
        end: Option<usize>,
        body_len: usize,
    },

    /// A path capture was applied to a body that is not JSON.
    CaptureBodyNotJson(String),

    /// A path step could not be followed.
    CaptureMissingPath {
        /// Path up to and including the failing step.
        path: String,
        /// Why the step failed.
        reason: String,
    },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::InvalidCaptureSpec { spec, reason } => {
                write!(f, "Invalid capture spec '{}': {}", spec, reason)
            }
            CaptureError::InvalidCaptureArgument { argument, reason } => {
                write!(f, "Invalid capture argument '{}': {}", argument, reason)
            }
            CaptureError::CaptureOutOfRange {
                start,
                end,
                body_len,
            } => match end {
                Some(end) => write!(
                    f,
                    "Capture range {}..{} is out of range for a {}-byte body",
                    start, end, body_len
                ),
                None => write!(
                    f,
                    "Capture offset {} is out of range for a {}-byte body",
                    start, body_len
                ),
            },
            CaptureError::CaptureBodyNotJson(msg) => {
                write!(f, "Response body is not valid JSON: {}", msg)
            }
            CaptureError::CaptureMissingPath { path, reason } => {
                write!(f, "Capture path '{}' not found: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for CaptureError {}

fn invalid_spec(spec: &str, reason: impl Into<String>) -> CaptureError {
    CaptureError::InvalidCaptureSpec {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

/// Parses a capture spec (the part after `VAR:`) for `var_name`.
///
/// # Examples
///
/// ```
/// use restcli::variables::capture::{parse_var_scraper_spec, PathStep, ScrapeKind};
///
/// let scraper = parse_var_scraper_spec("id", "items[0].id").unwrap();
/// assert_eq!(scraper.var_name, "ID");
/// assert_eq!(
///     scraper.kind,
///     ScrapeKind::Path(vec![
///         PathStep::Key("items".into()),
///         PathStep::Index(0),
///         PathStep::Key("id".into()),
///     ])
/// );
///
/// let range = parse_var_scraper_spec("head", ":0,4").unwrap();
/// assert_eq!(range.kind, ScrapeKind::Offset { start: 0, end: Some(4) });
/// ```
pub fn parse_var_scraper_spec(var_name: &str, spec: &str) -> Result<Scraper, CaptureError> {
    if !is_valid_variable_name(var_name) {
        return Err(CaptureError::InvalidCaptureArgument {
            argument: var_name.to_string(),
            reason: "not a legal variable name".to_string(),
        });
    }

    let kind = match spec.strip_prefix(':') {
        Some(range) => parse_offsets(spec, range)?,
        None => ScrapeKind::Path(parse_path(spec)?),
    };

    Ok(Scraper {
        var_name: canonical_name(var_name),
        kind,
    })
}

/// Parses a full `VAR:SPEC` capture argument.
///
/// The argument is split on the first `:` that is not preceded by a
/// backslash; byte ranges therefore read `VAR::START,END`.
///
/// # Examples
///
/// ```
/// use restcli::variables::capture::parse_var_scraper;
///
/// let scraper = parse_var_scraper("token:auth.token").unwrap();
/// assert_eq!(scraper.spec(), "auth.token");
///
/// assert!(parse_var_scraper("no-separator").is_err());
/// ```
pub fn parse_var_scraper(argument: &str) -> Result<Scraper, CaptureError> {
    let separator = find_unescaped_colon(argument).ok_or_else(|| {
        CaptureError::InvalidCaptureArgument {
            argument: argument.to_string(),
            reason: "expected VAR:SPEC".to_string(),
        }
    })?;

    let (var_name, spec) = (&argument[..separator], &argument[separator + 1..]);
    if !is_valid_variable_name(var_name) {
        return Err(CaptureError::InvalidCaptureArgument {
            argument: argument.to_string(),
            reason: format!("'{}' is not a legal variable name", var_name),
        });
    }

    parse_var_scraper_spec(var_name, spec)
}

fn find_unescaped_colon(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (0..bytes.len()).find(|&i| bytes[i] == b':' && (i == 0 || bytes[i - 1] != b'\\'))
}

fn parse_offset_number(spec: &str, text: &str, what: &str) -> Result<usize, CaptureError> {
    let text = text.trim();
    text.parse::<usize>()
        .map_err(|_| invalid_spec(spec, format!("{} offset '{}' is not a non-negative integer", what, text)))
}

fn parse_offsets(spec: &str, range: &str) -> Result<ScrapeKind, CaptureError> {
    let (start, end) = match range.split_once(',') {
        Some((start, end)) => (start, Some(end)),
        None => (range, None),
    };

    let start = parse_offset_number(spec, start, "start")?;
    let end = match end.map(str::trim) {
        None | Some("") => None,
        Some(end) => Some(parse_offset_number(spec, end, "end")?),
    };

    if let Some(end) = end {
        if start >= end {
            return Err(invalid_spec(spec, format!("start {} must be less than end {}", start, end)));
        }
    }

    Ok(ScrapeKind::Offset { start, end })
}

fn parse_path(spec: &str) -> Result<Vec<PathStep>, CaptureError> {
    if spec.is_empty() {
        return Err(invalid_spec(spec, "empty path"));
    }

    let mut steps = Vec::new();
    let mut rest = spec;
    let mut first = true;

    while !rest.is_empty() {
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let close = after_bracket
                .find(']')
                .ok_or_else(|| invalid_spec(spec, "unclosed '['"))?;
            let index_text = &after_bracket[..close];
            let index = index_text.parse::<usize>().map_err(|_| {
                invalid_spec(spec, format!("index '{}' is not a non-negative integer", index_text))
            })?;
            steps.push(PathStep::Index(index));
            rest = &after_bracket[close + 1..];
        } else {
            let key_text = match rest.strip_prefix('.') {
                Some(after_dot) => after_dot,
                None if first => rest,
                None => {
                    return Err(invalid_spec(
                        spec,
                        format!("expected '.' or '[' before '{}'", rest),
                    ))
                }
            };
            let key_len = key_text
                .find(|c: char| c == '.' || c == '[' || c == ']')
                .unwrap_or(key_text.len());
            if key_len == 0 {
                return Err(invalid_spec(spec, "empty key"));
            }
            steps.push(PathStep::Key(key_text[..key_len].to_string()));
            rest = &key_text[key_len..];
        }
        first = false;
    }

    Ok(steps)
}

/// Renders path steps; a leading key has no dot.
fn render_path(steps: &[PathStep]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        match step {
            PathStep::Key(key) if i == 0 => out.push_str(key),
            other => out.push_str(&other.to_string()),
        }
    }
    out
}

impl Scraper {
    /// Canonical textual spec, without the variable name.
    pub fn spec(&self) -> String {
        match &self.kind {
            ScrapeKind::Offset { start, end: Some(end) } => format!(":{},{}", start, end),
            ScrapeKind::Offset { start, end: None } => format!(":{},", start),
            ScrapeKind::Path(steps) => render_path(steps),
        }
    }

    /// Full `VAR:SPEC` argument form.
    pub fn argument(&self) -> String {
        format!("{}:{}", self.var_name, self.spec())
    }

    /// Extracts this capture's value from a response body.
    ///
    /// # Examples
    ///
    /// ```
    /// use restcli::variables::capture::parse_var_scraper;
    ///
    /// let scraper = parse_var_scraper("b:a[0].b").unwrap();
    /// assert_eq!(scraper.apply(br#"{"a":[{"b":"x"}]}"#).unwrap(), "x");
    ///
    /// let scraper = parse_var_scraper("mid::2,5").unwrap();
    /// assert_eq!(scraper.apply(b"abcdefgh").unwrap(), "cde");
    /// ```
    pub fn apply(&self, body: &[u8]) -> Result<String, CaptureError> {
        match &self.kind {
            ScrapeKind::Offset { start, end } => apply_offsets(body, *start, *end),
            ScrapeKind::Path(steps) => apply_path(body, steps),
        }
    }
}

impl fmt::Display for Scraper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argument())
    }
}

impl Serialize for Scraper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.argument())
    }
}

impl<'de> Deserialize<'de> for Scraper {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let argument = String::deserialize(deserializer)?;
        parse_var_scraper(&argument).map_err(serde::de::Error::custom)
    }
}

fn apply_offsets(body: &[u8], start: usize, end: Option<usize>) -> Result<String, CaptureError> {
    let out_of_range = || CaptureError::CaptureOutOfRange {
        start,
        end,
        body_len: body.len(),
    };

    let slice = match end {
        Some(end) => body.get(start..end).ok_or_else(out_of_range)?,
        None => body.get(start..).ok_or_else(out_of_range)?,
    };
    Ok(String::from_utf8_lossy(slice).into_owned())
}

fn apply_path(body: &[u8], steps: &[PathStep]) -> Result<String, CaptureError> {
    let json: JsonValue =
        serde_json::from_slice(body).map_err(|e| CaptureError::CaptureBodyNotJson(e.to_string()))?;

    let mut current = &json;
    for (i, step) in steps.iter().enumerate() {
        let missing = |reason: String| CaptureError::CaptureMissingPath {
            path: render_path(&steps[..=i]),
            reason,
        };

        current = match step {
            PathStep::Key(key) => match current {
                JsonValue::Object(map) => map
                    .get(key)
                    .ok_or_else(|| missing(format!("no member '{}'", key)))?,
                other => return Err(missing(format!("expected an object, found {}", json_kind(other)))),
            },
            PathStep::Index(index) => match current {
                JsonValue::Array(items) => items.get(*index).ok_or_else(|| {
                    missing(format!("index {} out of bounds for array of {}", index, items.len()))
                })?,
                other => return Err(missing(format!("expected an array, found {}", json_kind(other)))),
            },
        };
    }

    Ok(json_value_to_string(current))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Stringifies a captured JSON value.
///
/// Strings are returned unquoted, numbers as written in the body, null as
/// an empty string and containers as compact JSON.
fn json_value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}
