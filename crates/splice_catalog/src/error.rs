//! Catalog errors

use crate::catalog::CatalogTable;
use splice_core::LogicalName;
use std::path::PathBuf;

/// Errors raised by the catalog, its parsers and the surgeon
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog has not finished its initial load
    #[error("catalog is not ready")]
    NotReady,

    /// Entry id already present in a table
    #[error("{table} already contains '{id}'")]
    DuplicateEntry {
        /// Table
        table: CatalogTable,
        /// Entry id
        id: String,
    },

    /// Mapper already has a proxy factory
    #[error("mapper {name} is already registered")]
    MapperAlreadyRegistered {
        /// Mapper name
        name: LogicalName,
    },

    /// Descriptor file is not valid
    #[error("invalid descriptor {path}: {message}")]
    Descriptor {
        /// Descriptor path
        path: PathBuf,
        /// Parse failure
        message: String,
    },

    /// Descriptor names another mapper
    #[error("descriptor namespace {found} does not match mapper {expected}")]
    NamespaceMismatch {
        /// Mapper being parsed
        expected: LogicalName,
        /// Namespace in the descriptor
        found: String,
    },

    /// Descriptor could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Descriptor path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}
