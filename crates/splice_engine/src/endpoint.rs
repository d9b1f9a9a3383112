//! Endpoint generator: builds a handler and takes over its routes.

use crate::error::GenerateError;
use crate::generator::{instantiate, Replacement, ReplacementGenerator};
use splice_container::ObjectFactory;
use splice_endpoint::{mapping_for_method, routable_methods, HandlerMethod, SharedEndpointRegistry};
use splice_scope::{ReplacementUnit, TypeDef, TypeHandle};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Generator for endpoint handlers
#[derive(Clone)]
pub struct EndpointGenerator {
    factory: Arc<dyn ObjectFactory>,
    endpoints: SharedEndpointRegistry,
}

impl EndpointGenerator {
    /// Create a generator over a container and the live endpoint registry
    #[must_use]
    pub fn new(factory: Arc<dyn ObjectFactory>, endpoints: SharedEndpointRegistry) -> Self {
        Self { factory, endpoints }
    }
}

impl ReplacementGenerator for EndpointGenerator {
    fn name(&self) -> &'static str {
        "endpoint"
    }

    fn can_handle(&self, ty: &TypeDef) -> bool {
        ty.handler_base_path().is_some()
    }

    fn generate(
        &self,
        unit: &ReplacementUnit,
        ty: &TypeHandle,
    ) -> Result<Option<Replacement>, GenerateError> {
        let object = instantiate(self.factory.as_ref(), unit, ty)?;

        let mut routes = 0;
        for method in routable_methods(ty) {
            let Some(route) = mapping_for_method(ty, method) else {
                continue;
            };
            let handler = HandlerMethod::new(object.clone(), method.name.clone());
            let previous = self.endpoints.replace_registration(route.clone(), handler);
            debug!(
                unit = %unit.name,
                route = %route,
                previous = ?previous.map(|p| p.object.id()),
                "route now served by replacement"
            );
            routes += 1;
        }
        info!(unit = %unit.name, routes, "endpoint handler replaced");
        Ok(Some(Replacement::Object(object)))
    }
}

impl fmt::Debug for EndpointGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointGenerator")
            .field("routes", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}
