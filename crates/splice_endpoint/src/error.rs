//! Endpoint registry errors

use crate::route::RouteDescriptor;
use splice_container::ContainerError;
use splice_core::LogicalName;

/// Errors raised by the endpoint registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// Descriptor already bound
    #[error("route {route} is already registered")]
    AlreadyRegistered {
        /// Route
        route: RouteDescriptor,
    },

    /// Nothing bound to the descriptor
    #[error("no handler for {route}")]
    NotFound {
        /// Route
        route: RouteDescriptor,
    },

    /// Type carries no handler stereotype
    #[error("{ty} is not a handler")]
    NotAHandler {
        /// Offending type
        ty: LogicalName,
    },

    /// The bound method failed
    #[error("{route} failed: {source}")]
    Invocation {
        /// Route
        route: RouteDescriptor,
        /// Failure
        source: ContainerError,
    },
}
