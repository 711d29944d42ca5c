//! Scriptable command-line REST client
//!
//! Requests are kept as named templates inside a project file. Templates
//! reference variables (`${TOKEN}` or `$TOKEN`), capture values out of
//! responses into variables, and can be chained into flows where each step
//! sees what the previous steps captured and the cookies they received.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **variables**: Variable grammar, the resolver and the capture engine
//! - **environment**: Layered variable store with named environments
//! - **models**: Templates, sent requests, responses and send results
//! - **cookies**: Cookie parsing and the per-origin cookie jar
//! - **executor**: Sends one request and applies its captures
//! - **flow**: Runs templates and flows, propagating captured values
//! - **history**: JSON-lines history of every send
//! - **config**: Client configuration stored in the project file
//! - **project**: Project, session and sibling file persistence
//! - **commands**: Command handlers used by the `restcli` binary
//!
//! # Example
//!
//! ```no_run
//! use restcli::commands::Workspace;
//! use restcli::config::ConfigOverrides;
//! use restcli::flow::CompletedStep;
//! use restcli::variables::VariableSet;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workspace = Workspace::open("api.json", &ConfigOverrides::default())?;
//! let results = workspace.exec_flow("login-and-fetch", VariableSet::new(), &mut |step: &CompletedStep<'_>| {
//!     println!("{} -> {}", step.template.name, step.result.response.status_line());
//! })?;
//! println!("{} steps sent", results.len());
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod cookies;
pub mod environment;
pub mod executor;
pub mod flow;
pub mod history;
pub mod models;
pub mod project;
pub mod storage;
pub mod variables;
