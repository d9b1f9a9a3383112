//! Engine errors

use splice_catalog::CatalogError;
use splice_container::ContainerError;
use splice_core::{ConfigError, LogicalName};
use splice_endpoint::EndpointError;
use splice_scope::ScopeError;
use std::path::PathBuf;

/// Errors raised by the rewiring pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewireError {
    /// Several replacements fit a field and none is named after it
    #[error("{owner}.{field} is ambiguous between {}", .candidates.join(", "))]
    AmbiguousDependency {
        /// Replacement owning the field
        owner: LogicalName,
        /// Field name
        field: String,
        /// Names of the fitting replacements
        candidates: Vec<String>,
    },

    /// A dependency scheduled in this run produced nothing to wire
    #[error("{owner} depends on {dependency}, which is scheduled but has no replacement")]
    MissingDependency {
        /// Replacement owning the field
        owner: LogicalName,
        /// Scheduled dependency
        dependency: LogicalName,
    },

    /// A field was left empty at generation and nothing in the run fills it
    #[error("{owner}.{field} has no object of type {ty} in the container or the run")]
    UnresolvedDependency {
        /// Replacement owning the field
        owner: LogicalName,
        /// Field name
        field: String,
        /// Field type
        ty: LogicalName,
    },

    /// Assignment into a replacement failed
    #[error("cannot rewire {owner}: {source}")]
    Assign {
        /// Replacement owning the field
        owner: LogicalName,
        /// Failure
        source: ContainerError,
    },
}

/// Errors that leave one unit out of a run
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The replacement object could not be built
    #[error("cannot instantiate {unit}: {source}")]
    Instantiate {
        /// Unit name
        unit: LogicalName,
        /// Container failure
        source: ContainerError,
    },

    /// Catalog surgery failed
    #[error("catalog surgery on {unit} failed: {source}")]
    Surgery {
        /// Mapper name
        unit: LogicalName,
        /// Catalog failure
        source: CatalogError,
    },

    /// A mapper without a proxy factory still maps statements from an
    /// earlier parse, which were kept as they were
    #[error("mapper {unit} has no proxy factory, statements left unchanged: {}", .statements.join(", "))]
    StaleMapper {
        /// Mapper name
        unit: LogicalName,
        /// Statements kept from the earlier parse
        statements: Vec<String>,
    },
}

/// Errors that abort a hot-replacement run
#[derive(Debug, thiserror::Error)]
pub enum HotPatchError {
    /// Another run holds the engine
    #[error("a hot-replacement run is already in progress")]
    RunInProgress,

    /// The application's container cannot be driven
    #[error("container does not expose an object factory")]
    UnsupportedContainer,

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Discovery or loading failed for the whole run
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Mapping file exists but cannot be read
    #[error("cannot read mapping file {path}: {source}")]
    MappingFile {
        /// Mapping file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Dependency graph cannot be rewired
    #[error(transparent)]
    Rewire(#[from] RewireError),
}

/// Errors raised while booting an application directory
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Root types cannot be loaded
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Container cannot be assembled
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Handler routes cannot be registered
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// Mappers cannot be parsed
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
