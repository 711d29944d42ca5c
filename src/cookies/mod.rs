//! Cookie handling.
//!
//! Responses may set cookies through `Set-Cookie`; they are kept in a
//! [`CookieJar`] and attached to later requests whose URL they match.

pub mod cookie;
pub mod jar;

pub use cookie::{parse_set_cookie, Cookie};
pub use jar::{origin_of, CookieJar, JarEntry};
