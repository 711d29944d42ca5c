//! Errors raised while naming or resolving variables.

use std::fmt;

/// Errors that can occur during variable resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarError {
    /// A variable name contains characters outside `[A-Za-z0-9_]`,
    /// starts with a digit, or is empty.
    InvalidVariableName(String),

    /// A referenced variable has no value in the variable set.
    ///
    /// Resolution is strict: a missing variable is never replaced by an
    /// empty string.
    UndefinedVariable(String),

    /// An override argument has no `=` between name and value.
    MissingAssignment(String),
}

impl VarError {
    /// The variable name the error refers to.
    pub fn name(&self) -> &str {
        match self {
            VarError::InvalidVariableName(name)
            | VarError::UndefinedVariable(name)
            | VarError::MissingAssignment(name) => name,
        }
    }
}

impl fmt::Display for VarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarError::InvalidVariableName(name) => write!(
                f,
                "Invalid variable name '{}': use letters, digits and underscores, not starting with a digit",
                name
            ),
            VarError::UndefinedVariable(name) => write!(f, "Undefined variable: {}", name),
            VarError::MissingAssignment(arg) => {
                write!(f, "Expected NAME=VALUE, got '{}'", arg)
            }
        }
    }
}

impl std::error::Error for VarError {}
