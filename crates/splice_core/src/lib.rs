//! SPLICE Core Types
//!
//! Pure types shared by every stage of a hot-replacement run: validated
//! logical names, run and object identifiers, the core error and the
//! engine configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod id;
pub mod name;

// Re-exports
pub use config::{ConfigError, SpliceConfig, DEFAULT_MAPPING_FILE};
pub use error::{CoreError, CoreResult};
pub use id::{DefinitionId, ObjectId, RunId};
pub use name::{decapitalize, LogicalName, UNIT_EXTENSION};
