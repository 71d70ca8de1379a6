//! Error types surfaced by query building and pagination.
//!
//! Building is atomic: either a complete [`Query`](crate::Query) comes back or one of
//! these errors is raised before anything reaches an executor.

use crate::executor::ExecutorError;
use std::fmt;

/// Error raised while configuring, building or executing a controlled query
#[derive(Debug)]
pub enum QueryError {
    /// The controller is not usable as configured (no template, no alias, no `FROM`)
    Configuration(String),
    /// A filter value cannot be rendered for its operator
    UnsupportedValue(String),
    /// The expression resolver failed while resolving a late-bound value
    Resolution(String),
    /// The executor failed while running a built query
    Execution(ExecutorError),
}

impl QueryError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        QueryError::Configuration(message.into())
    }

    pub(crate) fn unsupported_value(message: impl Into<String>) -> Self {
        QueryError::UnsupportedValue(message.into())
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Configuration(s) => {
                write!(f, "Configuration error: {s}")
            }
            QueryError::UnsupportedValue(s) => {
                write!(f, "Unsupported value: {s}")
            }
            QueryError::Resolution(s) => {
                write!(f, "Resolution error: {s}")
            }
            QueryError::Execution(e) => {
                write!(f, "Execution error: {e}")
            }
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Execution(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ExecutorError> for QueryError {
    fn from(err: ExecutorError) -> Self {
        QueryError::Execution(err)
    }
}
