//! SPLICE Endpoint Registry
//!
//! Maps route descriptors to the handler object and method serving them.
//! Replacing a handler overwrites its registrations in place, so traffic
//! reaches the new object without the old descriptor ever being merged with
//! the new one.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod registry;
pub mod route;

pub use error::EndpointError;
pub use registry::{EndpointRegistry, HandlerMethod, SharedEndpointRegistry};
pub use route::{mapping_for_method, routable_methods, RouteDescriptor};
