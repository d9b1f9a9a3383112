//! Generator chain.
//!
//! A unit's category is resolved once at discovery; the chain maps each
//! category to exactly one generator. The persistence-mapper and endpoint
//! generators are only present when their collaborator is attached, and
//! their categories fall back to the generic generator otherwise.

use crate::endpoint::EndpointGenerator;
use crate::error::GenerateError;
use crate::generic::GenericGenerator;
use crate::mapper::MapperGenerator;
use splice_container::{ObjectFactory, ObjectRef, Wiring};
use splice_scope::{ReplacementUnit, TypeDef, TypeHandle, UnitCategory};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// What a generator produced for one unit
#[derive(Debug, Clone)]
pub enum Replacement {
    /// A new managed object
    Object(ObjectRef),
    /// The unit was handled without producing an object
    Handled,
}

impl Replacement {
    /// The produced object, if any
    #[must_use]
    pub fn object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            Self::Handled => None,
        }
    }

    /// Whether this is the handled sentinel
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// Strategy producing the replacement for one category of unit
pub trait ReplacementGenerator: Send + Sync + fmt::Debug {
    /// Short generator name for logs and reports
    fn name(&self) -> &'static str;

    /// Whether this generator accepts a type
    fn can_handle(&self, ty: &TypeDef) -> bool;

    /// Produce the replacement for a loaded unit
    ///
    /// `None` means there is nothing to build for the unit's shape.
    ///
    /// # Errors
    ///
    /// Returns error if the unit cannot be applied; the rest of the run
    /// goes on without it
    fn generate(
        &self,
        unit: &ReplacementUnit,
        ty: &TypeHandle,
    ) -> Result<Option<Replacement>, GenerateError>;
}

/// Fixed-priority dispatch from unit category to generator
#[derive(Debug)]
pub struct GeneratorChain {
    mapper: Option<MapperGenerator>,
    endpoint: Option<EndpointGenerator>,
    generic: GenericGenerator,
}

impl GeneratorChain {
    /// Chain with only the generic generator
    #[must_use]
    pub fn new(factory: Arc<dyn ObjectFactory>) -> Self {
        Self {
            mapper: None,
            endpoint: None,
            generic: GenericGenerator::new(factory),
        }
    }

    /// Attach the persistence-mapper generator
    #[must_use]
    pub fn with_mapper(mut self, mapper: MapperGenerator) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Attach the endpoint generator
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: EndpointGenerator) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Generator responsible for a category
    #[must_use]
    pub fn select(&self, category: UnitCategory) -> &dyn ReplacementGenerator {
        match category {
            UnitCategory::PersistenceMapper => match &self.mapper {
                Some(mapper) => mapper,
                None => &self.generic,
            },
            UnitCategory::EndpointHandler => match &self.endpoint {
                Some(endpoint) => endpoint,
                None => &self.generic,
            },
            UnitCategory::Plain | UnitCategory::Uninstantiable => &self.generic,
        }
    }

    /// Produce the replacement of a loaded unit
    ///
    /// # Errors
    ///
    /// Returns the selected generator's failure
    pub fn generate(
        &self,
        unit: &ReplacementUnit,
        ty: &TypeHandle,
    ) -> Result<Option<Replacement>, GenerateError> {
        let mut generator = self.select(unit.category);
        if !generator.can_handle(ty) {
            generator = &self.generic;
        }
        trace!(unit = %unit.name, generator = generator.name(), "dispatching unit");
        generator.generate(unit, ty)
    }
}

/// Reuse-or-create: configure a fresh instance against the slot named after
/// the unit if the container has one, otherwise create one
///
/// Fields the container cannot fill are left to the rewiring pass.
pub(crate) fn instantiate(
    factory: &dyn ObjectFactory,
    unit: &ReplacementUnit,
    ty: &TypeHandle,
) -> Result<ObjectRef, GenerateError> {
    let slot = unit.name.object_name();
    let result = if factory.contains_object(&slot) {
        factory.configure_object(ty, &slot, Wiring::Deferred)
    } else {
        factory.create_object(ty, Wiring::Deferred)
    };
    result.map_err(|source| GenerateError::Instantiate {
        unit: unit.name.clone(),
        source,
    })
}
