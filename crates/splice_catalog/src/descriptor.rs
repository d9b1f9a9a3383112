//! Companion mapper descriptors.
//!
//! A mapper may ship a descriptor next to its unit, at
//! `<ns path>/<Simple>.mapper.json`. It carries the statements and shapes
//! that do not fit on the mapper's own methods.

use crate::catalog::{CacheConfig, KeyGenerator, MappedStatement, MappingCatalog, ParameterMap, ResultMap};
use crate::error::CatalogError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use splice_core::LogicalName;
use splice_scope::{SelectKeySpec, StatementKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of a companion descriptor
pub const DESCRIPTOR_EXTENSION: &str = "mapper.json";

/// Loaded-resource marker of a mapper type
#[must_use]
pub fn type_resource(name: &LogicalName) -> String {
    format!("type:{}", name)
}

/// Loaded-resource marker of a mapper's companion descriptor
#[must_use]
pub fn descriptor_resource(name: &LogicalName) -> String {
    format!("{}.{}", name.as_str().replace('.', "/"), DESCRIPTOR_EXTENSION)
}

/// Cache section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Eviction policy
    #[serde(default = "default_eviction")]
    pub eviction: String,
    /// Capacity
    #[serde(default = "default_cache_size")]
    pub size: usize,
}

fn default_eviction() -> String {
    "LRU".to_string()
}

fn default_cache_size() -> usize {
    1024
}

/// Result map section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMapSection {
    /// Id relative to the namespace
    pub id: String,
    /// Property to column
    #[serde(default)]
    pub columns: IndexMap<String, String>,
}

/// Parameter map section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMapSection {
    /// Id relative to the namespace
    pub id: String,
    /// Properties in binding order
    #[serde(default)]
    pub properties: Vec<String>,
}

/// Statement section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSection {
    /// Method name
    pub id: String,
    /// Statement kind
    pub kind: StatementKind,
    /// Statement text
    pub sql: String,
    /// Result map id, relative unless qualified
    #[serde(default)]
    pub result_map: Option<String>,
    /// Generated-key rule
    #[serde(default)]
    pub select_key: Option<SelectKeySpec>,
}

/// Parsed companion descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperDescriptor {
    /// Mapper the descriptor belongs to
    pub namespace: String,
    /// Namespace cache
    #[serde(default)]
    pub cache: Option<CacheSection>,
    /// Result maps
    #[serde(default)]
    pub result_maps: Vec<ResultMapSection>,
    /// Parameter maps
    #[serde(default)]
    pub parameter_maps: Vec<ParameterMapSection>,
    /// Statements
    #[serde(default)]
    pub statements: Vec<StatementSection>,
}

impl MapperDescriptor {
    /// Path of a mapper's descriptor under a source root
    #[must_use]
    pub fn path_for(source_root: &Path, name: &LogicalName) -> PathBuf {
        source_root.join(name.relative_path(DESCRIPTOR_EXTENSION))
    }

    /// Parse a descriptor
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid descriptor
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self, CatalogError> {
        serde_json::from_slice(bytes).map_err(|e| CatalogError::Descriptor {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read the descriptor of a mapper, if there is one
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(source_root: &Path, name: &LogicalName) -> Result<Option<Self>, CatalogError> {
        let path = Self::path_for(source_root, name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(mapper = %name, path = %path.display(), "no companion descriptor");
                return Ok(None);
            }
            Err(source) => return Err(CatalogError::Io { path, source }),
        };
        Self::parse(&bytes, &path).map(Some)
    }

    /// Check that the descriptor belongs to `mapper`
    ///
    /// # Errors
    ///
    /// Returns error if the namespace is not `mapper`
    pub fn check_namespace(&self, mapper: &LogicalName) -> Result<(), CatalogError> {
        if self.namespace == mapper.as_str() {
            Ok(())
        } else {
            Err(CatalogError::NamespaceMismatch {
                expected: mapper.clone(),
                found: self.namespace.clone(),
            })
        }
    }

    /// Register the descriptor's contents into a catalog
    ///
    /// Returns the ids of the statements added.
    ///
    /// # Errors
    ///
    /// Returns error if the namespace is not `mapper` or an id is taken
    pub fn register(
        &self,
        catalog: &mut MappingCatalog,
        mapper: &LogicalName,
    ) -> Result<Vec<String>, CatalogError> {
        self.check_namespace(mapper)?;
        let resource = descriptor_resource(mapper);

        if let Some(cache) = &self.cache {
            catalog.add_cache(CacheConfig {
                id: self.namespace.clone(),
                eviction: cache.eviction.clone(),
                size: cache.size,
            })?;
        }
        for map in &self.result_maps {
            catalog.add_result_map(ResultMap {
                id: qualify(mapper, &map.id),
                columns: map.columns.clone(),
            })?;
        }
        for map in &self.parameter_maps {
            catalog.add_parameter_map(ParameterMap {
                id: qualify(mapper, &map.id),
                properties: map.properties.clone(),
            })?;
        }

        let mut added = Vec::new();
        for section in &self.statements {
            let id = mapper.member(&section.id);
            let key_generator = match &section.select_key {
                Some(key) => Some(add_key_generator(catalog, &id, key)?),
                None => None,
            };
            catalog.add_statement(MappedStatement {
                id: id.clone(),
                kind: section.kind,
                sql: section.sql.clone(),
                result_map: section.result_map.as_deref().map(|r| qualify(mapper, r)),
                key_generator,
                resource: resource.clone(),
            })?;
            added.push(id);
        }

        catalog.add_loaded_resource(resource);
        debug!(mapper = %mapper, statements = added.len(), "registered descriptor");
        Ok(added)
    }
}

/// Qualify a relative member id with the mapper name
pub(crate) fn qualify(mapper: &LogicalName, id: &str) -> String {
    if id.contains('.') {
        id.to_string()
    } else {
        mapper.member(id)
    }
}

/// Add the `!selectKey` generator of a statement, returning its id
pub(crate) fn add_key_generator(
    catalog: &mut MappingCatalog,
    statement_id: &str,
    key: &SelectKeySpec,
) -> Result<String, CatalogError> {
    let id = format!("{}!selectKey", statement_id);
    catalog.add_key_generator(KeyGenerator {
        id: id.clone(),
        sql: key.sql.clone(),
        key_property: key.key_property.clone(),
        before: key.before,
    })?;
    Ok(id)
}
