//! Statement markers declared on mapper methods.

use crate::catalog::{MappedStatement, MappingCatalog};
use crate::descriptor::{add_key_generator, qualify, type_resource};
use crate::error::CatalogError;
use splice_scope::{MethodDef, TypeDef};
use tracing::debug;

/// Which methods of a mapper to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodScope {
    /// Declared and inherited methods
    #[default]
    All,
    /// Declared methods only
    Declared,
}

/// Builds catalog entries from the statement markers on a mapper's methods
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationBuilder {
    scope: MethodScope,
}

impl AnnotationBuilder {
    /// Create a builder parsing the given methods
    #[must_use]
    pub fn new(scope: MethodScope) -> Self {
        Self { scope }
    }

    /// Methods this builder parses
    #[must_use]
    pub fn scope(&self) -> MethodScope {
        self.scope
    }

    /// Parse a mapper's method markers into the catalog
    ///
    /// Entries are keyed under the mapper's own name, inherited methods
    /// included. A statement that already exists is left alone, so a
    /// descriptor parsed first wins. Returns the ids of the statements added.
    ///
    /// # Errors
    ///
    /// Returns error if a key generator id is already taken
    pub fn parse(
        &self,
        catalog: &mut MappingCatalog,
        ty: &TypeDef,
    ) -> Result<Vec<String>, CatalogError> {
        let methods: Vec<&MethodDef> = match self.scope {
            MethodScope::All => ty.all_methods(),
            MethodScope::Declared => ty.declared_methods().iter().collect(),
        };
        let resource = type_resource(&ty.name);

        let mut added = Vec::new();
        for method in methods {
            let Some(spec) = &method.statement else {
                continue;
            };
            let id = ty.name.member(&method.name);
            if catalog.has_statement(&id) {
                debug!(statement = %id, "statement already mapped, keeping it");
                continue;
            }
            let key_generator = match &spec.select_key {
                Some(key) => Some(add_key_generator(catalog, &id, key)?),
                None => None,
            };
            catalog.add_statement(MappedStatement {
                id: id.clone(),
                kind: spec.kind,
                sql: spec.sql.clone(),
                result_map: spec.result_map.as_deref().map(|r| qualify(&ty.name, r)),
                key_generator,
                resource: resource.clone(),
            })?;
            added.push(id);
        }

        catalog.add_loaded_resource(resource);
        debug!(mapper = %ty.name, statements = added.len(), "parsed method markers");
        Ok(added)
    }
}
