//! Container contracts the engine depends on.

use crate::error::ContainerError;
use crate::object::ObjectRef;
use splice_scope::TypeHandle;
use std::sync::Arc;

/// How the injectable fields of a new object are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wiring {
    /// Every field must be satisfied by the container
    #[default]
    Complete,
    /// Fields the container cannot satisfy stay empty for a later pass
    Deferred,
}

/// Object factory of a live container
pub trait ObjectFactory: Send + Sync {
    /// Whether an object is registered under `name`
    fn contains_object(&self, name: &str) -> bool;

    /// Registered object under `name`
    fn object(&self, name: &str) -> Option<ObjectRef>;

    /// Instantiate `ty` and populate it against the existing slot `name`
    ///
    /// The slot's registered object is left in place.
    ///
    /// # Errors
    ///
    /// Returns error if the type cannot be instantiated or populated
    fn configure_object(
        &self,
        ty: &TypeHandle,
        name: &str,
        wiring: Wiring,
    ) -> Result<ObjectRef, ContainerError>;

    /// Instantiate and populate `ty` without registering it
    ///
    /// # Errors
    ///
    /// Returns error if the type cannot be instantiated or populated
    fn create_object(&self, ty: &TypeHandle, wiring: Wiring) -> Result<ObjectRef, ContainerError>;

    /// Remove the object registered under `name`
    fn evict_object(&self, name: &str) -> Option<ObjectRef>;
}

/// Application context hosting a container
pub trait ApplicationContext: Send + Sync {
    /// The container's object factory, if it is one the engine can drive
    fn object_factory(&self) -> Option<Arc<dyn ObjectFactory>>;
}

/// Context with a fixed factory
#[derive(Clone, Default)]
pub struct StaticContext {
    factory: Option<Arc<dyn ObjectFactory>>,
}

impl StaticContext {
    /// Context over a factory
    #[must_use]
    pub fn new(factory: Arc<dyn ObjectFactory>) -> Self {
        Self {
            factory: Some(factory),
        }
    }

    /// Context whose container cannot be driven
    #[must_use]
    pub fn unsupported() -> Self {
        Self { factory: None }
    }
}

impl ApplicationContext for StaticContext {
    fn object_factory(&self) -> Option<Arc<dyn ObjectFactory>> {
        self.factory.clone()
    }
}

impl std::fmt::Debug for StaticContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticContext")
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}
