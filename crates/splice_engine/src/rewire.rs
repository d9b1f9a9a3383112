//! Dependency rewiring pass.
//!
//! Runs once every replacement of a run exists. Each injectable field of a
//! replacement object is pointed at the replacement that stands in for its
//! dependency, so replaced units talk to each other and not to the objects
//! they replace.

use crate::error::RewireError;
use crate::generator::Replacement;
use crate::mapping::ImplementationMap;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use splice_container::ObjectRef;
use splice_core::{decapitalize, LogicalName};
use splice_scope::FieldDef;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// One injectable field of a replacement and the name it depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Replacement owning the field
    pub owner: LogicalName,
    /// Field name
    pub field: String,
    /// Logical name of the field's declared type
    pub target: LogicalName,
}

impl DependencyEdge {
    /// Edges of every injectable field of a replacement object
    #[must_use]
    pub fn of(owner: &LogicalName, object: &ObjectRef) -> Vec<Self> {
        object
            .ty()
            .injectable_fields()
            .map(|f| Self {
                owner: owner.clone(),
                field: f.name.clone(),
                target: f.ty.name.clone(),
            })
            .collect()
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.owner, self.field, self.target)
    }
}

/// How an edge found its replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Single assignable replacement
    Assignable,
    /// Several assignable replacements, one named after the field
    FieldName,
    /// Replacement registered under the dependency's own name
    SameName,
    /// Replacement named by the mapping file
    MappingFile,
    /// Replacement named by the naming strategy
    Naming,
}

/// Edge that was pointed at a replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedEdge {
    /// The rewired edge
    pub edge: DependencyEdge,
    /// Replacement now held by the field
    pub replacement: LogicalName,
    /// How it was found
    pub via: Resolution,
}

/// Derives an implementation name from a contract name
pub trait NamingStrategy: Send + Sync + fmt::Debug {
    /// Implementation name for a contract, if the strategy has one
    fn implementation_for(&self, contract: &LogicalName) -> Option<LogicalName>;
}

/// `a.b.C` is implemented by `a.b.impl.CImpl`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalImplNaming;

impl NamingStrategy for ConventionalImplNaming {
    fn implementation_for(&self, contract: &LogicalName) -> Option<LogicalName> {
        let ns = contract.namespace()?;
        LogicalName::parse(&format!("{}.impl.{}Impl", ns, contract.simple_name())).ok()
    }
}

/// No naming fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNamingFallback;

impl NamingStrategy for NoNamingFallback {
    fn implementation_for(&self, _contract: &LogicalName) -> Option<LogicalName> {
        None
    }
}

/// Field name a replacement is expected to be injected under
///
/// `UserServiceImpl` gives `userService`.
#[must_use]
pub fn derived_field_name(simple_name: &str) -> String {
    let name = decapitalize(simple_name);
    match name.strip_suffix("Impl") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => name,
    }
}

/// The rewiring pass
#[derive(Debug, Clone)]
pub struct Rewirer {
    mapping: ImplementationMap,
    naming: Arc<dyn NamingStrategy>,
}

impl Default for Rewirer {
    fn default() -> Self {
        Self::new(ImplementationMap::new())
    }
}

impl Rewirer {
    /// Create a pass with the conventional naming fallback
    #[must_use]
    pub fn new(mapping: ImplementationMap) -> Self {
        Self {
            mapping,
            naming: Arc::new(ConventionalImplNaming),
        }
    }

    /// Replace the naming fallback
    #[must_use]
    pub fn with_naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    /// Rewire every replacement object in `output`
    ///
    /// `scheduled` is every name discovered for the run. Returns the edges
    /// that now point at a replacement.
    ///
    /// # Errors
    ///
    /// Returns error on an ambiguous field, a scheduled dependency with
    /// nothing to wire in, or a field that is still empty
    pub fn rewire(
        &self,
        output: &IndexMap<LogicalName, Replacement>,
        scheduled: &IndexSet<LogicalName>,
    ) -> Result<Vec<AssignedEdge>, RewireError> {
        let mut assigned = Vec::new();
        for (owner, replacement) in output {
            let Replacement::Object(object) = replacement else {
                continue;
            };
            let edges = DependencyEdge::of(owner, object);
            for (field, edge) in object.ty().injectable_fields().zip(edges) {
                let Some((name, target, via)) = self.resolve(&edge, field, output, scheduled)? else {
                    if object.field(&field.name).is_none() {
                        return Err(RewireError::UnresolvedDependency {
                            owner: owner.clone(),
                            field: field.name.clone(),
                            ty: field.ty.name.clone(),
                        });
                    }
                    continue;
                };
                object
                    .set_field(&field.name, target)
                    .map_err(|source| RewireError::Assign {
                        owner: owner.clone(),
                        source,
                    })?;
                debug!(edge = %edge, replacement = %name, via = ?via, "rewired");
                assigned.push(AssignedEdge {
                    edge,
                    replacement: name,
                    via,
                });
            }
        }
        info!(edges = assigned.len(), "rewiring complete");
        Ok(assigned)
    }

    fn resolve(
        &self,
        edge: &DependencyEdge,
        field: &FieldDef,
        output: &IndexMap<LogicalName, Replacement>,
        scheduled: &IndexSet<LogicalName>,
    ) -> Result<Option<(LogicalName, ObjectRef, Resolution)>, RewireError> {
        let candidates: Vec<(&LogicalName, &ObjectRef)> = output
            .iter()
            .filter(|(name, _)| *name != &edge.owner)
            .filter_map(|(name, r)| r.object().map(|o| (name, o)))
            .filter(|(_, o)| o.ty().is_assignable_to(&field.ty))
            .collect();

        match candidates.as_slice() {
            [] => {}
            [(name, object)] => {
                return Ok(Some(((*name).clone(), (*object).clone(), Resolution::Assignable)));
            }
            many => {
                let named: Vec<_> = many
                    .iter()
                    .filter(|(name, _)| derived_field_name(name.simple_name()) == edge.field)
                    .collect();
                return match named.as_slice() {
                    [(name, object)] => Ok(Some(((*name).clone(), (*object).clone(), Resolution::FieldName))),
                    _ => Err(RewireError::AmbiguousDependency {
                        owner: edge.owner.clone(),
                        field: edge.field.clone(),
                        candidates: many.iter().map(|(name, _)| name.to_string()).collect(),
                    }),
                };
            }
        }

        let lookups = [
            (Some(edge.target.clone()), Resolution::SameName),
            (self.mapping.get(&edge.target).cloned(), Resolution::MappingFile),
            (self.naming.implementation_for(&edge.target), Resolution::Naming),
        ];
        for (name, via) in lookups {
            let Some(name) = name else {
                continue;
            };
            match output.get(&name) {
                Some(Replacement::Object(object)) => return Ok(Some((name, object.clone(), via))),
                Some(Replacement::Handled) => {
                    debug!(edge = %edge, handled = %name, "dependency handled without an object");
                    return Ok(None);
                }
                None => {}
            }
        }

        if scheduled.contains(&edge.target) {
            return Err(RewireError::MissingDependency {
                owner: edge.owner.clone(),
                dependency: edge.target.clone(),
            });
        }
        Ok(None)
    }
}
