//! Catalog surgery for replaced mappers.
//!
//! A mapper is replaced in place: its proxy factory survives, the entries
//! derived from its declared methods are cut out of the catalog, and the new
//! definition is parsed back in. Entries of inherited methods, and of every
//! other mapper, are left alone.

use crate::annotations::{AnnotationBuilder, MethodScope};
use crate::catalog::{CatalogTable, MappingCatalog, SharedCatalog};
use crate::descriptor::{descriptor_resource, type_resource, MapperDescriptor};
use crate::error::CatalogError;
use crate::proxy::MapperProxyFactory;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use splice_core::LogicalName;
use splice_scope::{TypeDef, TypeHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether `key` is `prefix` itself or a member of it
///
/// A member continues with `.` or `!`, so `a.M.get` covers `a.M.get!selectKey`
/// but never `a.M.getAll`.
#[must_use]
pub fn prefix_matches(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with('!'),
        None => false,
    }
}

/// Parses mappers into a catalog from their definition and source root
#[derive(Debug, Clone)]
pub struct MapperLoader {
    source_root: PathBuf,
}

impl MapperLoader {
    /// Create a loader reading descriptors under `source_root`
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    /// Root the descriptors are read from
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Initial parse of a mapper: descriptor, every method marker, then
    /// its proxy factory
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails or the mapper is already registered
    pub fn install(
        &self,
        catalog: &mut MappingCatalog,
        ty: &TypeDef,
    ) -> Result<Arc<MapperProxyFactory>, CatalogError> {
        if let Some(descriptor) = MapperDescriptor::load(&self.source_root, &ty.name)? {
            descriptor.register(catalog, &ty.name)?;
        }
        AnnotationBuilder::new(MethodScope::All).parse(catalog, ty)?;
        let factory = catalog.add_mapper(ty.name.clone())?;
        debug!(mapper = %ty.name, "installed mapper");
        Ok(factory)
    }

    /// Re-parse a replaced mapper: descriptor, then declared method markers
    ///
    /// Returns whether a descriptor was parsed and the statements added.
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails or an entry id is still taken
    pub fn reparse(
        &self,
        catalog: &mut MappingCatalog,
        ty: &TypeDef,
        descriptor: Option<&MapperDescriptor>,
    ) -> Result<(bool, Vec<String>), CatalogError> {
        let mut added = Vec::new();
        if let Some(descriptor) = descriptor {
            added.extend(descriptor.register(catalog, &ty.name)?);
        }
        added.extend(AnnotationBuilder::new(MethodScope::Declared).parse(catalog, ty)?);
        Ok((descriptor.is_some(), added))
    }
}

/// Outcome of one mapper surgery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurgeryReport {
    /// Operated mapper
    pub mapper: LogicalName,
    /// Whether the mapper had a proxy factory
    pub registered: bool,
    /// Method cache entries dropped
    pub method_cache_cleared: usize,
    /// Loaded-resource markers removed
    pub resources_removed: Vec<String>,
    /// Keys removed per table
    pub removed: IndexMap<CatalogTable, Vec<String>>,
    /// Whether a companion descriptor was parsed
    pub descriptor_reloaded: bool,
    /// Statements parsed back in
    pub statements_added: Vec<String>,
    /// Statements of an unregistered mapper that were already mapped and
    /// kept as they were
    pub statements_kept: Vec<String>,
}

impl SurgeryReport {
    /// Number of keys removed across every table
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.values().map(Vec::len).sum()
    }
}

/// Replaces a mapper's entries in a live catalog
#[derive(Debug, Clone)]
pub struct CatalogSurgeon {
    loader: MapperLoader,
}

impl CatalogSurgeon {
    /// Create a surgeon
    #[must_use]
    pub fn new(loader: MapperLoader) -> Self {
        Self { loader }
    }

    /// Loader used to parse replacements back in
    #[must_use]
    pub fn loader(&self) -> &MapperLoader {
        &self.loader
    }

    /// Swap the entries of `ty`'s mapper for those of the new definition
    ///
    /// The catalog write lock is held for the whole operation. A mapper
    /// that was never registered has nothing to remove; it is parsed in
    /// without a proxy factory.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog is still loading, or the new definition
    /// or its descriptor cannot be parsed
    pub fn operate(
        &self,
        catalog: &SharedCatalog,
        ty: &TypeHandle,
    ) -> Result<SurgeryReport, CatalogError> {
        let name = &ty.name;
        let descriptor = MapperDescriptor::load(self.loader.source_root(), name)?;
        if let Some(descriptor) = &descriptor {
            descriptor.check_namespace(name)?;
        }

        let mut catalog = catalog.write();
        if !catalog.is_ready() {
            return Err(CatalogError::NotReady);
        }

        let mut report = SurgeryReport {
            mapper: name.clone(),
            registered: false,
            method_cache_cleared: 0,
            resources_removed: Vec::new(),
            removed: IndexMap::new(),
            descriptor_reloaded: false,
            statements_added: Vec::new(),
            statements_kept: Vec::new(),
        };

        match catalog.mapper_factory(name) {
            Some(factory) => {
                report.registered = true;
                report.method_cache_cleared = factory.clear_method_cache();

                for resource in [type_resource(name), descriptor_resource(name)] {
                    if catalog.remove_loaded_resource(&resource) {
                        report.resources_removed.push(resource);
                    }
                }

                let prefixes = statement_prefixes(ty, descriptor.as_ref());
                let key_prefixes: Vec<String> =
                    prefixes.iter().map(|p| format!("{}!selectKey", p)).collect();
                let removals = [
                    (
                        CatalogTable::Statements,
                        catalog.remove_where(CatalogTable::Statements, |k| {
                            prefixes.iter().any(|p| prefix_matches(k, p))
                        }),
                    ),
                    (
                        CatalogTable::KeyGenerators,
                        catalog.remove_where(CatalogTable::KeyGenerators, |k| {
                            key_prefixes.iter().any(|p| prefix_matches(k, p))
                        }),
                    ),
                    (
                        CatalogTable::Caches,
                        catalog.remove_where(CatalogTable::Caches, |k| {
                            prefix_matches(k, name.as_str())
                        }),
                    ),
                    (
                        CatalogTable::ResultMaps,
                        catalog.remove_where(CatalogTable::ResultMaps, |k| {
                            prefix_matches(k, name.as_str())
                        }),
                    ),
                    (
                        CatalogTable::ParameterMaps,
                        catalog.remove_where(CatalogTable::ParameterMaps, |k| {
                            prefix_matches(k, name.as_str())
                        }),
                    ),
                ];
                report.removed = removals.into_iter().collect();
            }
            None => {
                warn!(mapper = %name, "mapper has no proxy factory, nothing to remove");
                report.statements_kept = statement_prefixes(ty, descriptor.as_ref())
                    .into_iter()
                    .filter(|id| catalog.has_statement(id))
                    .collect();
            }
        }

        let (reloaded, added) = self.loader.reparse(&mut catalog, ty, descriptor.as_ref())?;
        report.descriptor_reloaded = reloaded;
        report.statements_added = added;

        info!(
            mapper = %name,
            removed = report.removed_count(),
            added = report.statements_added.len(),
            cache_cleared = report.method_cache_cleared,
            "catalog surgery complete"
        );
        Ok(report)
    }
}

/// `mapper.method` prefixes of the declared methods, plus the statements
/// the descriptor is about to add back
fn statement_prefixes(ty: &TypeDef, descriptor: Option<&MapperDescriptor>) -> IndexSet<String> {
    let mut prefixes: IndexSet<String> = ty
        .declared_methods()
        .iter()
        .map(|m| ty.name.member(&m.name))
        .collect();
    if let Some(descriptor) = descriptor {
        prefixes.extend(descriptor.statements.iter().map(|s| ty.name.member(&s.id)));
    }
    prefixes
}
