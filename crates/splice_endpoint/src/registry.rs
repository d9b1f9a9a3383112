//! Route registry for handler objects.

use crate::error::EndpointError;
use crate::route::{mapping_for_method, routable_methods, RouteDescriptor};
use indexmap::IndexMap;
use parking_lot::RwLock;
use splice_container::ObjectRef;
use splice_scope::HttpVerb;
use std::sync::Arc;
use tracing::{debug, info};

/// Object and method serving a route
#[derive(Debug, Clone)]
pub struct HandlerMethod {
    /// Handler object
    pub object: ObjectRef,
    /// Method name
    pub method: String,
}

impl HandlerMethod {
    /// Create a handler method
    #[must_use]
    pub fn new(object: ObjectRef, method: impl Into<String>) -> Self {
        Self {
            object,
            method: method.into(),
        }
    }
}

/// Registry of route descriptors
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    routes: IndexMap<RouteDescriptor, HandlerMethod>,
}

impl EndpointRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a descriptor
    ///
    /// # Errors
    ///
    /// Returns error if the descriptor is already bound
    pub fn register(
        &mut self,
        route: RouteDescriptor,
        handler: HandlerMethod,
    ) -> Result<(), EndpointError> {
        if self.routes.contains_key(&route) {
            return Err(EndpointError::AlreadyRegistered { route });
        }
        debug!(route = %route, handler = %handler.object, method = %handler.method, "registered route");
        self.routes.insert(route, handler);
        Ok(())
    }

    /// Unbind a descriptor, returning what was bound
    pub fn unregister(&mut self, route: &RouteDescriptor) -> Option<HandlerMethod> {
        self.routes.shift_remove(route)
    }

    /// Bind every routable method of a handler object
    ///
    /// # Errors
    ///
    /// Returns error if the object's type is not a handler, or a route is
    /// already bound
    pub fn register_handler(&mut self, object: &ObjectRef) -> Result<usize, EndpointError> {
        let ty = object.ty().clone();
        if ty.handler_base_path().is_none() {
            return Err(EndpointError::NotAHandler {
                ty: ty.name.clone(),
            });
        }
        let mut count = 0;
        for method in routable_methods(&ty) {
            if let Some(route) = mapping_for_method(&ty, method) {
                self.register(route, HandlerMethod::new(object.clone(), method.name.clone()))?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Overwrite the binding of a descriptor, returning the previous one
    pub fn replace_registration(
        &mut self,
        route: RouteDescriptor,
        handler: HandlerMethod,
    ) -> Option<HandlerMethod> {
        let previous = self.unregister(&route);
        debug!(
            route = %route,
            handler = %handler.object,
            replaced = previous.is_some(),
            "replaced route registration"
        );
        self.routes.insert(route, handler);
        previous
    }

    /// Binding of a descriptor
    #[must_use]
    pub fn lookup(&self, route: &RouteDescriptor) -> Option<&HandlerMethod> {
        self.routes.get(route)
    }

    /// Bound descriptors in registration order
    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.keys()
    }

    /// Number of bound descriptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Thread-safe endpoint registry shared between the engine and request traffic
#[derive(Debug, Clone, Default)]
pub struct SharedEndpointRegistry {
    inner: Arc<RwLock<EndpointRegistry>>,
}

impl SharedEndpointRegistry {
    /// Create an empty shared registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a descriptor
    ///
    /// # Errors
    ///
    /// Returns error if the descriptor is already bound
    pub fn register(
        &self,
        route: RouteDescriptor,
        handler: HandlerMethod,
    ) -> Result<(), EndpointError> {
        self.inner.write().register(route, handler)
    }

    /// Bind every routable method of a handler object
    ///
    /// # Errors
    ///
    /// Returns error if the object is not a handler or a route is taken
    pub fn register_handler(&self, object: &ObjectRef) -> Result<usize, EndpointError> {
        let count = self.inner.write().register_handler(object)?;
        info!(handler = %object, routes = count, "registered handler");
        Ok(count)
    }

    /// Unregister and re-register a descriptor under one write lock
    pub fn replace_registration(
        &self,
        route: RouteDescriptor,
        handler: HandlerMethod,
    ) -> Option<HandlerMethod> {
        self.inner.write().replace_registration(route, handler)
    }

    /// Unbind a descriptor
    pub fn unregister(&self, route: &RouteDescriptor) -> Option<HandlerMethod> {
        self.inner.write().unregister(route)
    }

    /// Binding of a descriptor
    #[must_use]
    pub fn lookup(&self, route: &RouteDescriptor) -> Option<HandlerMethod> {
        self.inner.read().lookup(route).cloned()
    }

    /// Invoke the method bound to a verb and path
    ///
    /// The lock is released before the handler runs.
    ///
    /// # Errors
    ///
    /// Returns error if nothing is bound or the call fails
    pub fn dispatch(&self, verb: HttpVerb, path: &str) -> Result<String, EndpointError> {
        let route = RouteDescriptor::new(verb, path);
        let handler = self
            .lookup(&route)
            .ok_or_else(|| EndpointError::NotFound {
                route: route.clone(),
            })?;
        handler
            .object
            .invoke(&handler.method)
            .map_err(|source| EndpointError::Invocation { route, source })
    }

    /// Bound descriptors
    #[must_use]
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        self.inner.read().routes().cloned().collect()
    }

    /// Number of bound descriptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
