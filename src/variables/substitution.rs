//! Variable substitution engine for the REST client
//!
//! Replaces variable references in URLs, header values and bodies with
//! values from a [`VariableSet`]. A reference is the prefix symbol (`$` by
//! default) followed by either `{NAME}` or a bare identifier:
//!
//! ```text
//! GET ${BASE_URL}/users/$user_id
//! ```
//!
//! Grammar, applied left to right:
//!
//! - `PREFIX{NAME}` where `NAME` matches `[A-Za-z_][A-Za-z0-9_]*` is a reference.
//! - `PREFIX` followed by an identifier character starts a bare reference
//!   that extends over the longest `[A-Za-z0-9_]` run.
//! - Any other occurrence of the prefix (end of input, a digit, whitespace,
//!   an unclosed `{`, or braces around something that is not an identifier)
//!   is copied through unchanged.
//!
//! Lookup is case-insensitive and strict: a reference to a name missing from
//! the set is an [`VarError::UndefinedVariable`] error.
//!
//! Bodies are substituted at the byte level. A binary body that happens to
//! contain the prefix followed by identifier bytes is treated as a reference;
//! this is a known limitation of text substitution on binary payloads.

use super::{canonical_name, VarError, VariableSet};

/// Default variable prefix symbol.
pub const DEFAULT_PREFIX: &str = "$";

/// A piece of scanned input.
#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    /// Bytes copied through as-is.
    Literal(&'a [u8]),
    /// A variable reference, by name as written.
    Reference(&'a str),
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_identifier(bytes: &[u8]) -> bool {
    match bytes.split_first() {
        Some((first, rest)) => is_ident_start(*first) && rest.iter().all(|b| is_ident_continue(*b)),
        None => false,
    }
}

/// Tries to read a reference right after a prefix at `pos`.
///
/// Returns the name and the index just past the reference.
fn reference_at(input: &[u8], pos: usize) -> Option<(&str, usize)> {
    match input.get(pos) {
        Some(b'{') => {
            let close = input[pos + 1..].iter().position(|b| *b == b'}')? + pos + 1;
            let inner = &input[pos + 1..close];
            if !is_identifier(inner) {
                return None;
            }
            let name = std::str::from_utf8(inner).ok()?;
            Some((name, close + 1))
        }
        Some(b) if is_ident_start(*b) => {
            let len = input[pos..]
                .iter()
                .take_while(|b| is_ident_continue(**b))
                .count();
            let name = std::str::from_utf8(&input[pos..pos + len]).ok()?;
            Some((name, pos + len))
        }
        _ => None,
    }
}

/// Splits `input` into literal runs and references.
fn scan<'a>(input: &'a [u8], prefix: &[u8]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    if prefix.is_empty() {
        segments.push(Segment::Literal(input));
        return segments;
    }

    let mut literal_start = 0;
    let mut i = 0;
    while i < input.len() {
        if !input[i..].starts_with(prefix) {
            i += 1;
            continue;
        }

        let after_prefix = i + prefix.len();
        match reference_at(input, after_prefix) {
            Some((name, end)) => {
                if literal_start < i {
                    segments.push(Segment::Literal(&input[literal_start..i]));
                }
                segments.push(Segment::Reference(name));
                i = end;
                literal_start = end;
            }
            // Lone prefix: stays in the current literal run.
            None => i = after_prefix,
        }
    }

    if literal_start < input.len() {
        segments.push(Segment::Literal(&input[literal_start..]));
    }
    segments
}

fn lookup<'v>(vars: &'v VariableSet, name: &str) -> Result<&'v str, VarError> {
    vars.get(&canonical_name(name))
        .map(String::as_str)
        .ok_or_else(|| VarError::UndefinedVariable(canonical_name(name)))
}

/// Substitutes every variable reference in raw bytes.
///
/// # Arguments
///
/// * `input` - Raw bytes, typically a request body
/// * `vars` - Variables to resolve against
/// * `prefix` - The prefix symbol introducing a reference
///
/// # Returns
///
/// The substituted bytes, or the first [`VarError::UndefinedVariable`].
pub fn resolve_bytes(input: &[u8], vars: &VariableSet, prefix: &str) -> Result<Vec<u8>, VarError> {
    if prefix.is_empty() || !contains(input, prefix.as_bytes()) {
        return Ok(input.to_vec());
    }

    let mut output = Vec::with_capacity(input.len() + input.len() / 4);
    for segment in scan(input, prefix.as_bytes()) {
        match segment {
            Segment::Literal(bytes) => output.extend_from_slice(bytes),
            Segment::Reference(name) => output.extend_from_slice(lookup(vars, name)?.as_bytes()),
        }
    }
    Ok(output)
}

/// Substitutes every variable reference in `text`.
///
/// # Examples
///
/// ```
/// use restcli::variables::{resolve, variable_set};
///
/// let vars = variable_set([("host", "api.example.com"), ("id", "42")]);
/// let url = resolve("https://${HOST}/users/$id", &vars, "$").unwrap();
/// assert_eq!(url, "https://api.example.com/users/42");
///
/// // A prefix with no identifier after it is literal text.
/// assert_eq!(resolve("costs $5", &vars, "$").unwrap(), "costs $5");
/// ```
pub fn resolve(text: &str, vars: &VariableSet, prefix: &str) -> Result<String, VarError> {
    let bytes = resolve_bytes(text.as_bytes(), vars, prefix)?;
    // References and values are whole UTF-8 strings, so splicing them keeps the text valid.
    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

/// Lists the canonical names referenced by `text`, in order of first use.
pub fn referenced_variables(text: &str, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in scan(text.as_bytes(), prefix.as_bytes()) {
        if let Segment::Reference(name) = segment {
            let name = canonical_name(name);
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
