//! The shared mapping catalog.

use crate::error::CatalogError;
use crate::proxy::MapperProxyFactory;
use indexmap::{IndexMap, IndexSet};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use splice_core::LogicalName;
use splice_scope::{StatementKind, TypeDef};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// A parsed, executable statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedStatement {
    /// Qualified id, `mapper.method`
    pub id: String,
    /// Statement kind
    pub kind: StatementKind,
    /// Statement text
    pub sql: String,
    /// Qualified result map id
    pub result_map: Option<String>,
    /// Qualified key generator id
    pub key_generator: Option<String>,
    /// Resource the statement was parsed from
    pub resource: String,
}

/// Generated-key rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerator {
    /// Qualified id, `mapper.method!selectKey`
    pub id: String,
    /// Key query
    pub sql: String,
    /// Property receiving the key
    pub key_property: String,
    /// Run before the owning statement
    pub before: bool,
}

/// Result shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMap {
    /// Qualified id
    pub id: String,
    /// Property to column
    pub columns: IndexMap<String, String>,
}

/// Parameter shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMap {
    /// Qualified id
    pub id: String,
    /// Properties in binding order
    pub properties: Vec<String>,
}

/// Second-level cache of one mapper namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Namespace id
    pub id: String,
    /// Eviction policy
    pub eviction: String,
    /// Capacity
    pub size: usize,
}

/// Keyed tables of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogTable {
    /// Mapped statements
    Statements,
    /// Key generators
    KeyGenerators,
    /// Result maps
    ResultMaps,
    /// Parameter maps
    ParameterMaps,
    /// Caches
    Caches,
}

impl fmt::Display for CatalogTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Statements => "statements",
            Self::KeyGenerators => "key generators",
            Self::ResultMaps => "result maps",
            Self::ParameterMaps => "parameter maps",
            Self::Caches => "caches",
        };
        f.write_str(name)
    }
}

/// Lifecycle of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogState {
    /// Initial mappers are still being parsed
    #[default]
    Loading,
    /// Initial load finished; only surgery mutates the catalog
    Ready,
}

/// Mapping catalog of the persistence runtime
#[derive(Debug, Default)]
pub struct MappingCatalog {
    state: CatalogState,
    statements: IndexMap<String, Arc<MappedStatement>>,
    key_generators: IndexMap<String, KeyGenerator>,
    result_maps: IndexMap<String, ResultMap>,
    parameter_maps: IndexMap<String, ParameterMap>,
    caches: IndexMap<String, CacheConfig>,
    loaded_resources: IndexSet<String>,
    mappers: IndexMap<LogicalName, Arc<MapperProxyFactory>>,
}

impl MappingCatalog {
    /// Create an empty catalog in the loading state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> CatalogState {
        self.state
    }

    /// Whether the initial load finished
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == CatalogState::Ready
    }

    /// Finish the initial load
    pub fn mark_ready(&mut self) {
        self.state = CatalogState::Ready;
        info!(
            statements = self.statements.len(),
            mappers = self.mappers.len(),
            "mapping catalog ready"
        );
    }

    /// Add a statement
    ///
    /// # Errors
    ///
    /// Returns error if the id is taken
    pub fn add_statement(&mut self, statement: MappedStatement) -> Result<(), CatalogError> {
        insert_unique(
            &mut self.statements,
            CatalogTable::Statements,
            statement.id.clone(),
            Arc::new(statement),
        )
    }

    /// Add a key generator
    ///
    /// # Errors
    ///
    /// Returns error if the id is taken
    pub fn add_key_generator(&mut self, generator: KeyGenerator) -> Result<(), CatalogError> {
        insert_unique(
            &mut self.key_generators,
            CatalogTable::KeyGenerators,
            generator.id.clone(),
            generator,
        )
    }

    /// Add a result map
    ///
    /// # Errors
    ///
    /// Returns error if the id is taken
    pub fn add_result_map(&mut self, map: ResultMap) -> Result<(), CatalogError> {
        insert_unique(&mut self.result_maps, CatalogTable::ResultMaps, map.id.clone(), map)
    }

    /// Add a parameter map
    ///
    /// # Errors
    ///
    /// Returns error if the id is taken
    pub fn add_parameter_map(&mut self, map: ParameterMap) -> Result<(), CatalogError> {
        insert_unique(
            &mut self.parameter_maps,
            CatalogTable::ParameterMaps,
            map.id.clone(),
            map,
        )
    }

    /// Add a cache
    ///
    /// # Errors
    ///
    /// Returns error if the id is taken
    pub fn add_cache(&mut self, cache: CacheConfig) -> Result<(), CatalogError> {
        insert_unique(&mut self.caches, CatalogTable::Caches, cache.id.clone(), cache)
    }

    /// Statement by id
    #[must_use]
    pub fn statement(&self, id: &str) -> Option<Arc<MappedStatement>> {
        self.statements.get(id).cloned()
    }

    /// Check if a statement exists
    #[must_use]
    pub fn has_statement(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    /// Key generator by id
    #[must_use]
    pub fn key_generator(&self, id: &str) -> Option<&KeyGenerator> {
        self.key_generators.get(id)
    }

    /// Resolve the statement a mapper method runs
    ///
    /// Looks under the mapper's own name first, then under each supertype
    /// that declares the method.
    #[must_use]
    pub fn resolve_statement(&self, ty: &TypeDef, method: &str) -> Option<Arc<MappedStatement>> {
        if let Some(found) = self.statement(&ty.name.member(method)) {
            return Some(found);
        }
        ty.supertypes
            .iter()
            .filter(|s| s.find_method(method).is_some())
            .find_map(|s| self.resolve_statement(s, method))
    }

    /// Keys of a table in insertion order
    #[must_use]
    pub fn keys(&self, table: CatalogTable) -> Vec<String> {
        match table {
            CatalogTable::Statements => self.statements.keys().cloned().collect(),
            CatalogTable::KeyGenerators => self.key_generators.keys().cloned().collect(),
            CatalogTable::ResultMaps => self.result_maps.keys().cloned().collect(),
            CatalogTable::ParameterMaps => self.parameter_maps.keys().cloned().collect(),
            CatalogTable::Caches => self.caches.keys().cloned().collect(),
        }
    }

    /// Check if a table holds a key
    #[must_use]
    pub fn contains(&self, table: CatalogTable, key: &str) -> bool {
        match table {
            CatalogTable::Statements => self.statements.contains_key(key),
            CatalogTable::KeyGenerators => self.key_generators.contains_key(key),
            CatalogTable::ResultMaps => self.result_maps.contains_key(key),
            CatalogTable::ParameterMaps => self.parameter_maps.contains_key(key),
            CatalogTable::Caches => self.caches.contains_key(key),
        }
    }

    /// Remove every key of a table that satisfies `predicate`
    ///
    /// Returns the removed keys.
    pub fn remove_where<F>(&mut self, table: CatalogTable, predicate: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        match table {
            CatalogTable::Statements => remove_keys(&mut self.statements, predicate),
            CatalogTable::KeyGenerators => remove_keys(&mut self.key_generators, predicate),
            CatalogTable::ResultMaps => remove_keys(&mut self.result_maps, predicate),
            CatalogTable::ParameterMaps => remove_keys(&mut self.parameter_maps, predicate),
            CatalogTable::Caches => remove_keys(&mut self.caches, predicate),
        }
    }

    /// Mark a resource as parsed
    pub fn add_loaded_resource(&mut self, resource: impl Into<String>) {
        self.loaded_resources.insert(resource.into());
    }

    /// Check if a resource was parsed
    #[must_use]
    pub fn is_resource_loaded(&self, resource: &str) -> bool {
        self.loaded_resources.contains(resource)
    }

    /// Forget a parsed resource
    pub fn remove_loaded_resource(&mut self, resource: &str) -> bool {
        self.loaded_resources.shift_remove(resource)
    }

    /// Register a proxy factory for a mapper
    ///
    /// # Errors
    ///
    /// Returns error if the mapper already has one
    pub fn add_mapper(&mut self, name: LogicalName) -> Result<Arc<MapperProxyFactory>, CatalogError> {
        if self.mappers.contains_key(&name) {
            return Err(CatalogError::MapperAlreadyRegistered { name });
        }
        let factory = Arc::new(MapperProxyFactory::new(name.clone()));
        self.mappers.insert(name, factory.clone());
        Ok(factory)
    }

    /// Proxy factory of a mapper
    #[must_use]
    pub fn mapper_factory(&self, name: &LogicalName) -> Option<Arc<MapperProxyFactory>> {
        self.mappers.get(name).cloned()
    }

    /// Registered mapper names
    #[must_use]
    pub fn mapper_names(&self) -> Vec<LogicalName> {
        self.mappers.keys().cloned().collect()
    }
}

fn insert_unique<V>(
    table: &mut IndexMap<String, V>,
    kind: CatalogTable,
    id: String,
    value: V,
) -> Result<(), CatalogError> {
    if table.contains_key(&id) {
        return Err(CatalogError::DuplicateEntry { table: kind, id });
    }
    table.insert(id, value);
    Ok(())
}

fn remove_keys<V, F>(table: &mut IndexMap<String, V>, predicate: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let doomed: Vec<String> = table.keys().filter(|k| predicate(k.as_str())).cloned().collect();
    for key in &doomed {
        table.shift_remove(key);
    }
    doomed
}

/// Catalog shared by mapper proxies and the surgeon
#[derive(Debug, Clone, Default)]
pub struct SharedCatalog {
    inner: Arc<RwLock<MappingCatalog>>,
}

impl SharedCatalog {
    /// Wrap a catalog
    #[must_use]
    pub fn new(catalog: MappingCatalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(catalog)),
        }
    }

    /// Read access
    pub fn read(&self) -> RwLockReadGuard<'_, MappingCatalog> {
        self.inner.read()
    }

    /// Write access
    pub fn write(&self) -> RwLockWriteGuard<'_, MappingCatalog> {
        self.inner.write()
    }
}
