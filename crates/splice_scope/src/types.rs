//! Resolved type definitions.
//!
//! A `TypeDef` is what a scope produces when it defines a unit image: every
//! supertype and field type is resolved to a concrete loaded definition.
//! Identity is the definition id, never the logical name, so two loads of
//! the same name are distinct types.

use crate::image::{MethodBody, RouteSpec, StatementSpec, Stereotype, TypeShape};
use crate::scope::ScopeId;
use indexmap::IndexSet;
use splice_core::{DefinitionId, LogicalName};
use std::fmt;
use std::sync::Arc;

/// Shared handle to a loaded definition
pub type TypeHandle = Arc<TypeDef>;

/// Injectable or plain field of a loaded type
#[derive(Clone)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Resolved declared type
    pub ty: TypeHandle,
    /// Whether the container injects this field
    pub injectable: bool,
}

/// Method of a loaded type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Route marker
    pub route: Option<RouteSpec>,
    /// Statement marker
    pub statement: Option<StatementSpec>,
    /// Body
    pub body: Option<MethodBody>,
}

/// Category a unit is dispatched on, resolved once per definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    /// Persistence-mapping contract (interface marked `repository`)
    PersistenceMapper,
    /// Externally routable handler
    EndpointHandler,
    /// Anything else that can be instantiated
    Plain,
    /// Interface, abstract, enum or annotation shape
    Uninstantiable,
}

impl UnitCategory {
    /// Classify a shape and its role markers
    #[must_use]
    pub fn classify(shape: TypeShape, stereotypes: &[Stereotype]) -> Self {
        let repository = stereotypes.contains(&Stereotype::Repository);
        let handler = stereotypes
            .iter()
            .any(|s| matches!(s, Stereotype::Handler { .. }));

        if shape == TypeShape::Interface && repository {
            Self::PersistenceMapper
        } else if !shape.is_instantiable() {
            Self::Uninstantiable
        } else if handler {
            Self::EndpointHandler
        } else {
            Self::Plain
        }
    }
}

impl std::fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PersistenceMapper => "persistence-mapper",
            Self::EndpointHandler => "endpoint-handler",
            Self::Plain => "plain",
            Self::Uninstantiable => "uninstantiable",
        };
        f.write_str(name)
    }
}

/// A loaded, resolved type
pub struct TypeDef {
    /// Unique identity of this definition
    pub id: DefinitionId,
    /// Logical name
    pub name: LogicalName,
    /// Shape
    pub shape: TypeShape,
    /// Role markers
    pub stereotypes: Vec<Stereotype>,
    /// Resolved supertypes
    pub supertypes: Vec<TypeHandle>,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
    /// Directly declared methods
    pub methods: Vec<MethodDef>,
    /// Scope that defined this type
    pub scope: ScopeId,
}

impl TypeDef {
    /// Whether a value of this type can be stored in a slot of `target`
    #[must_use]
    pub fn is_assignable_to(&self, target: &TypeDef) -> bool {
        if self.id == target.id {
            return true;
        }
        self.supertypes.iter().any(|s| s.is_assignable_to(target))
    }

    /// Whether this definition carries a stereotype of the same kind
    #[must_use]
    pub fn has_stereotype(&self, kind: &Stereotype) -> bool {
        self.stereotypes
            .iter()
            .any(|s| std::mem::discriminant(s) == std::mem::discriminant(kind))
    }

    /// Base path of a handler, if this type is one
    #[must_use]
    pub fn handler_base_path(&self) -> Option<&str> {
        self.stereotypes.iter().find_map(|s| match s {
            Stereotype::Handler { base_path } => Some(base_path.as_str()),
            _ => None,
        })
    }

    /// Whether this type is a persistence-mapping contract
    #[must_use]
    pub fn is_mapper(&self) -> bool {
        self.shape == TypeShape::Interface && self.has_stereotype(&Stereotype::Repository)
    }

    /// Dispatch category
    #[must_use]
    pub fn category(&self) -> UnitCategory {
        UnitCategory::classify(self.shape, &self.stereotypes)
    }

    /// Methods declared directly on this type
    #[must_use]
    pub fn declared_methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Declared methods followed by inherited ones; a declared method hides
    /// an inherited method of the same name
    #[must_use]
    pub fn all_methods(&self) -> Vec<&MethodDef> {
        let mut seen = IndexSet::new();
        let mut out = Vec::new();
        self.collect_methods(&mut seen, &mut out);
        out
    }

    fn collect_methods<'a>(&'a self, seen: &mut IndexSet<&'a str>, out: &mut Vec<&'a MethodDef>) {
        for method in &self.methods {
            if seen.insert(method.name.as_str()) {
                out.push(method);
            }
        }
        for parent in &self.supertypes {
            parent.collect_methods(seen, out);
        }
    }

    /// Find a method by name, searching supertypes
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name)
            .or_else(|| self.supertypes.iter().find_map(|s| s.find_method(name)))
    }

    /// Fields the container injects
    pub fn injectable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.injectable)
    }

    /// Find a field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty.name)
            .field("injectable", &self.injectable)
            .finish()
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(name: &str, shape: TypeShape, supertypes: Vec<TypeHandle>) -> TypeHandle {
        Arc::new(TypeDef {
            id: DefinitionId::next(),
            name: LogicalName::parse(name).unwrap(),
            shape,
            stereotypes: Vec::new(),
            supertypes,
            fields: Vec::new(),
            methods: Vec::new(),
            scope: ScopeId::ROOT,
        })
    }

    fn method(name: &str) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            route: None,
            statement: None,
            body: None,
        }
    }

    #[test]
    fn test_assignability_is_transitive() {
        let base = bare("demo.Base", TypeShape::Interface, vec![]);
        let mid = bare("demo.Mid", TypeShape::Interface, vec![base.clone()]);
        let leaf = bare("demo.Leaf", TypeShape::Class, vec![mid.clone()]);

        assert!(leaf.is_assignable_to(&base));
        assert!(leaf.is_assignable_to(&mid));
        assert!(!base.is_assignable_to(&leaf));
    }

    #[test]
    fn test_same_name_different_definition_not_assignable() {
        let first = bare("demo.Shared", TypeShape::Class, vec![]);
        let second = bare("demo.Shared", TypeShape::Class, vec![]);
        assert!(!first.is_assignable_to(&second));
    }

    #[test]
    fn test_category() {
        let mut mapper = TypeDef {
            id: DefinitionId::next(),
            name: LogicalName::parse("demo.mapper.UserMapper").unwrap(),
            shape: TypeShape::Interface,
            stereotypes: vec![Stereotype::Repository],
            supertypes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            scope: ScopeId::ROOT,
        };
        assert_eq!(mapper.category(), UnitCategory::PersistenceMapper);

        mapper.stereotypes.clear();
        assert_eq!(mapper.category(), UnitCategory::Uninstantiable);

        mapper.shape = TypeShape::Class;
        mapper.stereotypes.push(Stereotype::Handler {
            base_path: "/x".to_string(),
        });
        assert_eq!(mapper.category(), UnitCategory::EndpointHandler);
    }

    #[test]
    fn test_declared_methods_hide_inherited() {
        let mut base = TypeDef {
            id: DefinitionId::next(),
            name: LogicalName::parse("demo.BaseMapper").unwrap(),
            shape: TypeShape::Interface,
            stereotypes: Vec::new(),
            supertypes: Vec::new(),
            fields: Vec::new(),
            methods: vec![method("selectById"), method("list")],
            scope: ScopeId::ROOT,
        };
        base.methods[1].body = Some(MethodBody::Literal("base".to_string()));
        let base = Arc::new(base);

        let mut child = TypeDef {
            id: DefinitionId::next(),
            name: LogicalName::parse("demo.UserMapper").unwrap(),
            shape: TypeShape::Interface,
            stereotypes: Vec::new(),
            supertypes: vec![base],
            fields: Vec::new(),
            methods: vec![method("list")],
            scope: ScopeId::ROOT,
        };
        child.methods[0].body = Some(MethodBody::Literal("child".to_string()));

        let names: Vec<_> = child.all_methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["list", "selectById"]);
        assert_eq!(child.declared_methods().len(), 1);
        assert_eq!(
            child.find_method("list").unwrap().body,
            Some(MethodBody::Literal("child".to_string()))
        );
        assert!(child.find_method("selectById").is_some());
    }
}
