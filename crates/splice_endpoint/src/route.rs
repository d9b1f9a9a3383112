//! Route descriptors and handler introspection.

use serde::{Deserialize, Serialize};
use splice_scope::{HttpVerb, MethodDef, TypeDef};
use std::fmt;

/// Verb and normalized path of one externally reachable operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Verb
    pub verb: HttpVerb,
    /// Normalized path, always starting with `/`
    pub path: String,
}

impl RouteDescriptor {
    /// Create a descriptor, normalizing the path
    #[must_use]
    pub fn new(verb: HttpVerb, path: &str) -> Self {
        Self {
            verb,
            path: normalize(&[path]),
        }
    }

    /// Descriptor for a method path under a handler base path
    #[must_use]
    pub fn joined(verb: HttpVerb, base: &str, path: &str) -> Self {
        Self {
            verb,
            path: normalize(&[base, path]),
        }
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path)
    }
}

/// Join path parts into `/a/b` form with no empty segments
fn normalize(parts: &[&str]) -> String {
    let segments: Vec<&str> = parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Methods of a handler type that carry a route, inherited ones included
///
/// Types without the handler stereotype expose nothing.
#[must_use]
pub fn routable_methods(ty: &TypeDef) -> Vec<&MethodDef> {
    if ty.handler_base_path().is_none() {
        return Vec::new();
    }
    ty.all_methods()
        .into_iter()
        .filter(|m| m.route.is_some())
        .collect()
}

/// Route descriptor of one method of a handler type
#[must_use]
pub fn mapping_for_method(ty: &TypeDef, method: &MethodDef) -> Option<RouteDescriptor> {
    let base = ty.handler_base_path()?;
    let route = method.route.as_ref()?;
    Some(RouteDescriptor::joined(route.verb, base, &route.path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_core::{DefinitionId, LogicalName};
    use splice_scope::{RouteSpec, ScopeId, Stereotype, TypeShape};
    use std::sync::Arc;

    fn routed(name: &str, verb: HttpVerb, path: &str) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            route: Some(RouteSpec {
                verb,
                path: path.to_string(),
            }),
            statement: None,
            body: None,
        }
    }

    fn handler(base: &str, methods: Vec<MethodDef>) -> TypeDef {
        TypeDef {
            id: DefinitionId::next(),
            name: LogicalName::parse("demo.controller.UserController").unwrap(),
            shape: TypeShape::Class,
            stereotypes: vec![Stereotype::Handler {
                base_path: base.to_string(),
            }],
            supertypes: Vec::new(),
            fields: Vec::new(),
            methods,
            scope: ScopeId::ROOT,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(RouteDescriptor::joined(HttpVerb::Get, "/user/", "/list").path, "/user/list");
        assert_eq!(RouteDescriptor::joined(HttpVerb::Get, "user", "").path, "/user");
        assert_eq!(RouteDescriptor::new(HttpVerb::Post, "").path, "/");
        assert_eq!(RouteDescriptor::new(HttpVerb::Post, "//a//b/").to_string(), "POST /a/b");
    }

    #[test]
    fn test_routable_methods_include_inherited() {
        let mut base = handler("/base", vec![routed("health", HttpVerb::Get, "/health")]);
        base.stereotypes.clear();
        let mut ty = handler(
            "/user",
            vec![
                routed("list", HttpVerb::Get, "/list"),
                MethodDef {
                    name: "helper".to_string(),
                    route: None,
                    statement: None,
                    body: None,
                },
            ],
        );
        ty.supertypes.push(Arc::new(base));

        let names: Vec<_> = routable_methods(&ty).iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["list", "health"]);

        let health = ty.find_method("health").unwrap();
        assert_eq!(
            mapping_for_method(&ty, health),
            Some(RouteDescriptor::new(HttpVerb::Get, "/user/health"))
        );
    }

    #[test]
    fn test_non_handler_exposes_nothing() {
        let mut ty = handler("/user", vec![routed("list", HttpVerb::Get, "/list")]);
        ty.stereotypes = vec![Stereotype::Service];
        assert!(routable_methods(&ty).is_empty());
        assert!(mapping_for_method(&ty, &ty.methods[0]).is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_normalized_paths_are_clean(base in "[a-z/]{0,12}", path in "[a-z/]{0,12}") {
            let desc = RouteDescriptor::joined(HttpVerb::Get, &base, &path);
            proptest::prop_assert!(desc.path.starts_with('/'));
            proptest::prop_assert!(!desc.path.contains("//"));
            proptest::prop_assert!(desc.path == "/" || !desc.path.ends_with('/'));
        }
    }
}
