//! Mapper proxies.
//!
//! Mapper interfaces have no body of their own. The container holds a proxy
//! object per mapper whose calls resolve to statements in the catalog.

use crate::catalog::{MappedStatement, SharedCatalog};
use indexmap::IndexMap;
use parking_lot::RwLock;
use splice_container::{ContainerError, ManagedObject, ProxyHandler};
use splice_core::LogicalName;
use std::sync::Arc;
use tracing::trace;

/// Per-mapper factory holding the method-to-statement cache
#[derive(Debug)]
pub struct MapperProxyFactory {
    mapper: LogicalName,
    method_cache: RwLock<IndexMap<String, Arc<MappedStatement>>>,
}

impl MapperProxyFactory {
    /// Create a factory with an empty cache
    #[must_use]
    pub fn new(mapper: LogicalName) -> Self {
        Self {
            mapper,
            method_cache: RwLock::new(IndexMap::new()),
        }
    }

    /// Mapper this factory serves
    #[must_use]
    pub fn mapper(&self) -> &LogicalName {
        &self.mapper
    }

    /// Cached statement of a method
    #[must_use]
    pub fn cached(&self, method: &str) -> Option<Arc<MappedStatement>> {
        self.method_cache.read().get(method).cloned()
    }

    /// Remember the statement a method resolved to
    pub fn cache(&self, method: &str, statement: Arc<MappedStatement>) {
        self.method_cache.write().insert(method.to_string(), statement);
    }

    /// Drop every cached entry, returning how many there were
    pub fn clear_method_cache(&self) -> usize {
        let mut cache = self.method_cache.write();
        let count = cache.len();
        cache.clear();
        count
    }

    /// Number of cached entries
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.method_cache.read().len()
    }
}

/// Proxy handler executing mapper methods against the catalog
#[derive(Debug, Clone)]
pub struct MapperProxy {
    catalog: SharedCatalog,
    factory: Arc<MapperProxyFactory>,
}

impl MapperProxy {
    /// Create a proxy backed by a catalog and a mapper's factory
    #[must_use]
    pub fn new(catalog: SharedCatalog, factory: Arc<MapperProxyFactory>) -> Self {
        Self { catalog, factory }
    }

    /// Factory behind this proxy
    #[must_use]
    pub fn factory(&self) -> &Arc<MapperProxyFactory> {
        &self.factory
    }
}

impl ProxyHandler for MapperProxy {
    fn invoke(&self, target: &ManagedObject, method: &str) -> Result<String, ContainerError> {
        let ty = target.ty();
        // The proxy keeps the interface it was created for.
        if ty.find_method(method).is_none() {
            return Err(ContainerError::NoSuchMethod {
                ty: ty.name.clone(),
                method: method.to_string(),
            });
        }

        let statement = match self.factory.cached(method) {
            Some(statement) => statement,
            None => {
                let resolved = self.catalog.read().resolve_statement(ty, method);
                let statement = resolved.ok_or_else(|| ContainerError::Proxy {
                    ty: ty.name.clone(),
                    message: format!("no mapped statement for '{}'", method),
                })?;
                self.factory.cache(method, statement.clone());
                statement
            }
        };
        trace!(mapper = %ty.name, method, statement = %statement.id, "mapper call");
        Ok(format!("{}: {}", statement.kind, statement.sql))
    }
}
