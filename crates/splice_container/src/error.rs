//! Container errors

use splice_core::LogicalName;

/// Errors raised by the container and by managed objects
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    /// Type cannot be instantiated
    #[error("{ty} cannot be instantiated")]
    NotInstantiable {
        /// Requested type
        ty: LogicalName,
    },

    /// An object is already registered under this name
    #[error("object '{name}' is already registered")]
    DuplicateObject {
        /// Object name
        name: String,
    },

    /// No object registered under this name
    #[error("no object named '{name}'")]
    UnknownObject {
        /// Object name
        name: String,
    },

    /// Type has no such field
    #[error("{owner} has no field '{field}'")]
    UnknownField {
        /// Owning type
        owner: LogicalName,
        /// Field name
        field: String,
    },

    /// No registered object fits an injectable field
    #[error("no object of type {ty} for {owner}.{field}")]
    UnsatisfiedDependency {
        /// Owning type
        owner: LogicalName,
        /// Field name
        field: String,
        /// Field type
        ty: LogicalName,
    },

    /// Several registered objects fit and none is named after the field
    #[error("{owner}.{field} matches several objects: {}", .candidates.join(", "))]
    AmbiguousCandidates {
        /// Owning type
        owner: LogicalName,
        /// Field name
        field: String,
        /// Names of the matching objects
        candidates: Vec<String>,
    },

    /// Type has no such method
    #[error("{ty} has no method '{method}'")]
    NoSuchMethod {
        /// Receiver type
        ty: LogicalName,
        /// Method name
        method: String,
    },

    /// Method has no executable body
    #[error("{ty}.{method} has no body")]
    NoBody {
        /// Receiver type
        ty: LogicalName,
        /// Method name
        method: String,
    },

    /// A delegating body found its field empty
    #[error("{owner}.{field} is not wired")]
    UnwiredField {
        /// Owning type
        owner: LogicalName,
        /// Field name
        field: String,
    },

    /// Proxy handler failed
    #[error("proxy for {ty} failed: {message}")]
    Proxy {
        /// Proxied type
        ty: LogicalName,
        /// Failure description
        message: String,
    },
}
