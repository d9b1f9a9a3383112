//! Generic generator: builds plain objects through the container.

use crate::error::GenerateError;
use crate::generator::{instantiate, Replacement, ReplacementGenerator};
use splice_container::ObjectFactory;
use splice_scope::{ReplacementUnit, TypeDef, TypeHandle};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Fallback generator for every category
#[derive(Clone)]
pub struct GenericGenerator {
    factory: Arc<dyn ObjectFactory>,
}

impl GenericGenerator {
    /// Create a generator over a container
    #[must_use]
    pub fn new(factory: Arc<dyn ObjectFactory>) -> Self {
        Self { factory }
    }
}

impl ReplacementGenerator for GenericGenerator {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn can_handle(&self, _ty: &TypeDef) -> bool {
        true
    }

    fn generate(
        &self,
        unit: &ReplacementUnit,
        ty: &TypeHandle,
    ) -> Result<Option<Replacement>, GenerateError> {
        if !ty.shape.is_instantiable() {
            debug!(unit = %unit.name, shape = ?ty.shape, "not instantiable, nothing to generate");
            return Ok(None);
        }
        let object = instantiate(self.factory.as_ref(), unit, ty)?;
        Ok(Some(Replacement::Object(object)))
    }
}

impl fmt::Debug for GenericGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericGenerator").finish_non_exhaustive()
    }
}
