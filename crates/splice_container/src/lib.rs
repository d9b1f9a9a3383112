//! SPLICE Object Container
//!
//! Managed objects and the container contract the engine builds replacements
//! through. Objects carry an explicit field table keyed by field name, filled
//! from the injectable fields of their type, so dependencies can be
//! inspected and repointed without runtime introspection.
//!
//! [`Container`] is an in-memory container used by the demo application and
//! the tests; any other container plugs in through [`ObjectFactory`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod error;
pub mod factory;
pub mod object;

pub use container::Container;
pub use error::ContainerError;
pub use factory::{ApplicationContext, ObjectFactory, StaticContext, Wiring};
pub use object::{Backing, ManagedObject, ObjectRef, ProxyHandler};
