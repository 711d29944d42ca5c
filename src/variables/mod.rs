//! Variables module for the REST client
//!
//! This module provides the variable grammar shared by the store, the
//! resolver and the capture engine:
//!
//! - **substitution**: replaces `${NAME}` / `$NAME` references in URLs,
//!   header values and bodies
//! - **capture**: parses capture specifications and scrapes values out of
//!   response bodies
//!
//! Variable names are case-insensitive. Every name is canonicalized to
//! uppercase before it is stored or looked up.

pub mod capture;
pub mod error;
pub mod substitution;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

pub use capture::{parse_var_scraper, parse_var_scraper_spec, CaptureError, PathStep, ScrapeKind, Scraper};
pub use error::VarError;
pub use substitution::{referenced_variables, resolve, resolve_bytes, DEFAULT_PREFIX};

/// A flattened set of variable values ready for resolution.
///
/// Keys are canonical (uppercase) variable names.
pub type VariableSet = HashMap<String, String>;

/// Identifier grammar for variable names.
static VARIABLE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Failed to compile variable name regex")
});

/// Returns `true` if `name` is a legal variable name.
///
/// # Examples
///
/// ```
/// use restcli::variables::is_valid_variable_name;
///
/// assert!(is_valid_variable_name("auth_token"));
/// assert!(!is_valid_variable_name("2fa"));
/// assert!(!is_valid_variable_name(""));
/// ```
pub fn is_valid_variable_name(name: &str) -> bool {
    VARIABLE_NAME_REGEX.is_match(name)
}

/// Canonical form of a variable name.
pub fn canonical_name(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// Validates `name` and returns its canonical form.
pub fn validate_variable_name(name: &str) -> Result<String, VarError> {
    if is_valid_variable_name(name) {
        Ok(canonical_name(name))
    } else {
        Err(VarError::InvalidVariableName(name.to_string()))
    }
}

/// Builds a [`VariableSet`] from arbitrary `(name, value)` pairs,
/// canonicalizing every name.
pub fn variable_set<I, K, V>(pairs: I) -> VariableSet
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (canonical_name(k.as_ref()), v.into()))
        .collect()
}

/// Parses a `NAME=VALUE` override argument.
pub fn parse_assignment(arg: &str) -> Result<(String, String), VarError> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| VarError::MissingAssignment(arg.to_string()))?;
    let name = validate_variable_name(name.trim())?;
    Ok((name, value.to_string()))
}
