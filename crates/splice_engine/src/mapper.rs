//! Persistence-mapper generator: operates on the catalog, never builds an
//! object.

use crate::error::GenerateError;
use crate::generator::{Replacement, ReplacementGenerator};
use splice_catalog::{CatalogSurgeon, SharedCatalog};
use splice_scope::{ReplacementUnit, TypeDef, TypeHandle};
use tracing::{info, warn};

/// Generator for persistence mappers
#[derive(Debug, Clone)]
pub struct MapperGenerator {
    catalog: SharedCatalog,
    surgeon: CatalogSurgeon,
}

impl MapperGenerator {
    /// Create a generator over the live catalog
    #[must_use]
    pub fn new(catalog: SharedCatalog, surgeon: CatalogSurgeon) -> Self {
        Self { catalog, surgeon }
    }
}

impl ReplacementGenerator for MapperGenerator {
    fn name(&self) -> &'static str {
        "mapper"
    }

    fn can_handle(&self, ty: &TypeDef) -> bool {
        ty.is_mapper()
    }

    fn generate(
        &self,
        unit: &ReplacementUnit,
        ty: &TypeHandle,
    ) -> Result<Option<Replacement>, GenerateError> {
        let report = self
            .surgeon
            .operate(&self.catalog, ty)
            .map_err(|source| GenerateError::Surgery {
                unit: unit.name.clone(),
                source,
            })?;
        if !report.statements_kept.is_empty() {
            warn!(unit = %unit.name, kept = ?report.statements_kept, "mapper left unchanged");
            return Err(GenerateError::StaleMapper {
                unit: unit.name.clone(),
                statements: report.statements_kept,
            });
        }
        info!(
            unit = %unit.name,
            removed = report.removed_count(),
            added = report.statements_added.len(),
            "mapper replaced in catalog"
        );
        Ok(Some(Replacement::Handled))
    }
}
