//! Core error types for SPLICE.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid logical name
    InvalidName {
        /// Offending name or path
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { name, reason } => {
                write!(f, "Invalid logical name '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for CoreError {}
