//! Scope and discovery errors

use crate::image::ImageError;
use splice_core::LogicalName;
use std::path::PathBuf;

/// Errors raised while discovering or defining units
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// Unit bytes are not a valid image
    #[error("cannot decode {name}: {source}")]
    Image {
        /// Unit being decoded
        name: LogicalName,
        /// Decode failure
        source: ImageError,
    },

    /// Image declares a different name than the one requested
    #[error("image for {expected} declares name {found}")]
    NameMismatch {
        /// Requested name
        expected: LogicalName,
        /// Name inside the image
        found: LogicalName,
    },

    /// Scope already holds a definition for this name
    #[error("{name} is already defined in this scope")]
    AlreadyDefined {
        /// Offending name
        name: LogicalName,
    },

    /// Scope is bound to a different unit
    #[error("scope of {scope_owner} cannot define {name}")]
    ForeignName {
        /// Unit the scope belongs to
        scope_owner: LogicalName,
        /// Name that was attempted
        name: LogicalName,
    },

    /// A referenced type is not visible from the defining scope
    #[error("{name} is not loaded")]
    MissingReference {
        /// Missing type
        name: LogicalName,
    },

    /// The unit source has no bytes for a referenced type
    #[error("no unit bytes for referenced type {name}")]
    MissingBytes {
        /// Referenced type
        name: LogicalName,
    },

    /// A reference stays missing after its bytes were defined
    #[error("reference {name} cannot be resolved")]
    UnresolvableReference {
        /// Referenced type
        name: LogicalName,
    },

    /// Definitions refer to each other before either exists
    #[error("cyclic reference between {name} and {through}")]
    CyclicReference {
        /// Type being defined
        name: LogicalName,
        /// Reference that leads back to it
        through: LogicalName,
    },

    /// Name cannot be resolved from the scope
    #[error("{name} not found")]
    NotFound {
        /// Requested name
        name: LogicalName,
    },

    /// Name is not a discovered unit of this run
    #[error("{name} is not a discovered unit")]
    UnitNotFound {
        /// Requested name
        name: LogicalName,
    },

    /// Unit file cannot be mapped to a logical name
    #[error("cannot locate unit {path}: {reason}")]
    Unlocatable {
        /// Unit file
        path: PathBuf,
        /// Why no name could be derived
        reason: String,
    },

    /// Source root is missing or unreadable
    #[error("source root {path} unavailable: {source}")]
    SourceRoot {
        /// Configured root
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Unit file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl ScopeError {
    /// Whether this error only affects the unit it was raised for
    #[must_use]
    pub fn is_unit_local(&self) -> bool {
        matches!(
            self,
            Self::Image { .. }
                | Self::NameMismatch { .. }
                | Self::AlreadyDefined { .. }
                | Self::ForeignName { .. }
                | Self::NotFound { .. }
                | Self::CyclicReference { .. }
        )
    }
}
