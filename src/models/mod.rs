//! Data models for requests, responses and send results.
//!
//! This module contains the core data structures shared by the sender, the
//! flow executor and persistence.

pub mod body;
pub mod collection;
pub mod headers;
pub mod request;
pub mod response;
pub mod result;

pub use body::Body;
pub use collection::{Named, NamedSet};
pub use headers::Headers;
pub use request::{RequestTemplate, SentRequest};
pub use response::HttpResponse;
pub use result::SendResult;
