//! Unit loader scopes.
//!
//! Scopes live in an arena and point at their parent by index. The root scope
//! is backed by the application's [`TypeSpace`], which outlives any single
//! run; child scopes are created per replacement unit and dropped with the
//! arena.
//!
//! Resolution from a scope checks its own definitions first, then walks the
//! parent chain, and only then defines staged local bytes on demand. A type
//! defined in a child scope is a new definition, distinct from any type of
//! the same name in the root.

use crate::error::ScopeError;
use crate::image::UnitImage;
use crate::types::{FieldDef, MethodDef, TypeDef, TypeHandle};
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use splice_core::{DefinitionId, LogicalName, UNIT_EXTENSION};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Index of a scope inside a [`ScopeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The root scope, backed by the application's type space
    pub const ROOT: Self = Self(0);

    /// Raw arena index
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }

    /// Whether this is the root scope
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Persistent set of root definitions shared by every run
#[derive(Clone, Default)]
pub struct TypeSpace {
    types: Arc<RwLock<IndexMap<LogicalName, TypeHandle>>>,
}

impl TypeSpace {
    /// Create an empty type space
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a root definition
    #[must_use]
    pub fn get(&self, name: &LogicalName) -> Option<TypeHandle> {
        self.types.read().get(name).cloned()
    }

    /// Check if a name is defined at the root
    #[must_use]
    pub fn contains(&self, name: &LogicalName) -> bool {
        self.types.read().contains_key(name)
    }

    /// Defined names in definition order
    #[must_use]
    pub fn names(&self) -> Vec<LogicalName> {
        self.types.read().keys().cloned().collect()
    }

    /// Number of root definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    pub(crate) fn insert(&self, handle: TypeHandle) {
        self.types.write().insert(handle.name.clone(), handle);
    }
}

impl fmt::Debug for TypeSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpace")
            .field("types", &self.len())
            .finish()
    }
}

/// Where a scope fetches bytes for a referenced type it cannot resolve
pub trait UnitSource: Send + Sync {
    /// Fetch the raw image of a unit, or `None` if the source has none
    ///
    /// # Errors
    ///
    /// Returns error if the bytes exist but cannot be read
    fn fetch(&self, name: &LogicalName) -> Result<Option<Vec<u8>>, ScopeError>;
}

/// Unit source laid out by namespace under one directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Create a source over a directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expected file path of a unit
    #[must_use]
    pub fn path_for(&self, name: &LogicalName) -> PathBuf {
        self.root.join(name.relative_path(UNIT_EXTENSION))
    }
}

impl UnitSource for DirectorySource {
    fn fetch(&self, name: &LogicalName) -> Result<Option<Vec<u8>>, ScopeError> {
        let path = self.path_for(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ScopeError::Io { path, source }),
        }
    }
}

/// Namespaces whose units are defined in the parent scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentPolicy {
    prefixes: Vec<String>,
}

impl ParentPolicy {
    /// Create a policy from namespace prefixes
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` must be defined in the parent scope
    #[must_use]
    pub fn forces_parent(&self, name: &LogicalName) -> bool {
        self.prefixes.iter().any(|p| name.is_within(p))
    }

    /// Configured prefixes
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

struct ScopeNode {
    parent: Option<ScopeId>,
    owner: Option<LogicalName>,
    defined: IndexMap<LogicalName, TypeHandle>,
    pending: IndexMap<LogicalName, Vec<u8>>,
}

impl ScopeNode {
    fn new(parent: Option<ScopeId>, owner: Option<LogicalName>) -> Self {
        Self {
            parent,
            owner,
            defined: IndexMap::new(),
            pending: IndexMap::new(),
        }
    }
}

/// Arena of loader scopes for one run
///
/// Scope ids are only meaningful for the arena that issued them; passing a
/// foreign id panics on lookup.
pub struct ScopeArena {
    space: TypeSpace,
    nodes: Vec<ScopeNode>,
    source: Arc<dyn UnitSource>,
    policy: ParentPolicy,
    defining: Vec<LogicalName>,
    introduced: IndexSet<LogicalName>,
}

impl ScopeArena {
    /// Create an arena whose root is `space`
    #[must_use]
    pub fn new(space: TypeSpace, source: Arc<dyn UnitSource>) -> Self {
        Self {
            space,
            nodes: vec![ScopeNode::new(None, None)],
            source,
            policy: ParentPolicy::default(),
            defining: Vec::new(),
            introduced: IndexSet::new(),
        }
    }

    /// Set the parent policy
    #[must_use]
    pub fn with_policy(mut self, policy: ParentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Root type space
    #[must_use]
    pub fn space(&self) -> &TypeSpace {
        &self.space
    }

    /// Parent policy
    #[must_use]
    pub fn policy(&self) -> &ParentPolicy {
        &self.policy
    }

    /// Create a child scope, optionally bound to the one name it may define
    pub fn child(&mut self, parent: ScopeId, owner: Option<LogicalName>) -> ScopeId {
        let id = ScopeId(self.nodes.len());
        self.nodes.push(ScopeNode::new(Some(parent), owner));
        trace!(scope = %id, parent = %parent, "created scope");
        id
    }

    /// Parent of a scope (`None` for the root)
    #[must_use]
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.nodes[scope.0].parent
    }

    /// Unit a scope is bound to
    #[must_use]
    pub fn owner(&self, scope: ScopeId) -> Option<&LogicalName> {
        self.nodes[scope.0].owner.as_ref()
    }

    /// Number of scopes, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false, the root scope exists from creation
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stage bytes that `load` defines locally on first demand
    pub fn stage(&mut self, scope: ScopeId, name: LogicalName, bytes: Vec<u8>) {
        self.nodes[scope.0].pending.insert(name, bytes);
    }

    /// Definition held by this scope itself
    #[must_use]
    pub fn find_loaded(&self, scope: ScopeId, name: &LogicalName) -> Option<TypeHandle> {
        if scope.is_root() {
            self.space.get(name)
        } else {
            self.nodes[scope.0].defined.get(name).cloned()
        }
    }

    /// Resolve from this scope or its parent chain, without defining anything
    #[must_use]
    pub fn resolve(&self, scope: ScopeId, name: &LogicalName) -> Option<TypeHandle> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.find_loaded(id, name) {
                return Some(found);
            }
            current = self.parent(id);
        }
        None
    }

    /// Load a type as seen from `scope`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if neither the scope chain nor staged bytes provide
    /// the name, or the definition error of staged bytes
    pub fn load(&mut self, scope: ScopeId, name: &LogicalName) -> Result<TypeHandle, ScopeError> {
        if let Some(found) = self.resolve(scope, name) {
            return Ok(found);
        }
        let staged = self.nodes[scope.0].pending.get(name).cloned();
        match staged {
            Some(bytes) => {
                let handle = self.define_local(scope, name, &bytes)?;
                self.nodes[scope.0].pending.shift_remove(name);
                Ok(handle)
            }
            None => Err(ScopeError::NotFound { name: name.clone() }),
        }
    }

    /// Define a unit in this scope
    ///
    /// # Errors
    ///
    /// Returns error if the scope belongs to another name, already holds a
    /// definition for `name`, or the bytes cannot be defined
    pub fn define_local(
        &mut self,
        scope: ScopeId,
        name: &LogicalName,
        bytes: &[u8],
    ) -> Result<TypeHandle, ScopeError> {
        if let Some(owner) = self.owner(scope) {
            if owner != name {
                return Err(ScopeError::ForeignName {
                    scope_owner: owner.clone(),
                    name: name.clone(),
                });
            }
        }
        if self.find_loaded(scope, name).is_some() {
            return Err(ScopeError::AlreadyDefined { name: name.clone() });
        }

        let handle = self.build(scope, name, bytes)?;
        self.insert(scope, handle.clone());
        debug!(unit = %name, scope = %scope, definition = %handle.id, "defined locally");
        Ok(handle)
    }

    /// Define a unit in the parent of `scope` (the root defines in itself)
    ///
    /// A name the parent chain already resolves is returned as is.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be defined
    pub fn define_in_parent(
        &mut self,
        scope: ScopeId,
        name: &LogicalName,
        bytes: &[u8],
    ) -> Result<TypeHandle, ScopeError> {
        let target = self.parent(scope).unwrap_or(ScopeId::ROOT);
        if let Some(existing) = self.resolve(target, name) {
            debug!(unit = %name, scope = %target, "already satisfied in parent");
            return Ok(existing);
        }

        let handle = self.build(target, name, bytes)?;
        self.insert(target, handle.clone());
        self.introduced.insert(name.clone());
        debug!(unit = %name, scope = %target, definition = %handle.id, "defined in parent");
        Ok(handle)
    }

    /// Define a replacement unit where it belongs
    ///
    /// Names under a parent-policy namespace, and names the parent does not
    /// know yet, go to the parent so that every scope shares one identity for
    /// them. This includes names this arena already placed in a parent while
    /// fetching a forward reference. Everything else becomes a new local
    /// definition.
    ///
    /// # Errors
    ///
    /// Returns the error of the chosen definition route
    pub fn define_unit(
        &mut self,
        scope: ScopeId,
        name: &LogicalName,
        bytes: &[u8],
    ) -> Result<TypeHandle, ScopeError> {
        let parent = self.parent(scope).unwrap_or(ScopeId::ROOT);
        if self.policy.forces_parent(name) {
            debug!(unit = %name, "namespace is shared with the parent scope");
            return self.define_in_parent(scope, name, bytes);
        }
        if self.introduced.contains(name) || self.resolve(parent, name).is_none() {
            debug!(unit = %name, "new type, defining in parent scope");
            return self.define_in_parent(scope, name, bytes);
        }
        self.define_local(scope, name, bytes)
    }

    fn insert(&mut self, scope: ScopeId, handle: TypeHandle) {
        if scope.is_root() {
            self.space.insert(handle);
        } else {
            self.nodes[scope.0]
                .defined
                .insert(handle.name.clone(), handle);
        }
    }

    fn build(
        &mut self,
        scope: ScopeId,
        name: &LogicalName,
        bytes: &[u8],
    ) -> Result<TypeHandle, ScopeError> {
        let image = UnitImage::decode(bytes).map_err(|source| ScopeError::Image {
            name: name.clone(),
            source,
        })?;
        if image.name != *name {
            return Err(ScopeError::NameMismatch {
                expected: name.clone(),
                found: image.name,
            });
        }
        let self_reference = image.extends.contains(name) || image.fields.iter().any(|f| f.ty == *name);
        if self_reference {
            return Err(ScopeError::CyclicReference {
                name: name.clone(),
                through: name.clone(),
            });
        }

        self.defining.push(name.clone());
        let result = self.link_with_fetch(scope, &image);
        self.defining.pop();
        result
    }

    /// Link an image, defining missing references in the parent until every
    /// reference resolves
    fn link_with_fetch(&mut self, scope: ScopeId, image: &UnitImage) -> Result<TypeHandle, ScopeError> {
        let mut fetched = IndexSet::new();
        loop {
            let missing = match self.link(scope, image) {
                Ok(def) => return Ok(Arc::new(def)),
                Err(missing) => missing,
            };

            if self.defining.contains(&missing) {
                return Err(ScopeError::CyclicReference {
                    name: image.name.clone(),
                    through: missing,
                });
            }
            if !fetched.insert(missing.clone()) {
                return Err(ScopeError::UnresolvableReference { name: missing });
            }

            let bytes = self
                .source
                .fetch(&missing)?
                .ok_or_else(|| ScopeError::MissingBytes {
                    name: missing.clone(),
                })?;
            debug!(unit = %image.name, reference = %missing, "fetching forward reference into parent");
            self.define_in_parent(scope, &missing, &bytes)?;
        }
    }

    /// Resolve every reference of an image, or report the first missing one
    fn link(&self, scope: ScopeId, image: &UnitImage) -> Result<TypeDef, LogicalName> {
        let resolve = |name: &LogicalName| self.resolve(scope, name).ok_or_else(|| name.clone());

        let supertypes = image
            .extends
            .iter()
            .map(resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let fields = image
            .fields
            .iter()
            .map(|f| {
                Ok(FieldDef {
                    name: f.name.clone(),
                    ty: resolve(&f.ty)?,
                    injectable: f.inject,
                })
            })
            .collect::<Result<Vec<_>, LogicalName>>()?;
        let methods = image
            .methods
            .iter()
            .map(|m| MethodDef {
                name: m.name.clone(),
                route: m.route.clone(),
                statement: m.statement.clone(),
                body: m.body.clone(),
            })
            .collect();

        Ok(TypeDef {
            id: DefinitionId::next(),
            name: image.name.clone(),
            shape: image.shape,
            stereotypes: image.stereotypes.clone(),
            supertypes,
            fields,
            methods,
            scope,
        })
    }
}

impl fmt::Debug for ScopeArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeArena")
            .field("scopes", &self.nodes.len())
            .field("space", &self.space)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Stereotype, TypeShape};

    struct MapSource(IndexMap<LogicalName, Vec<u8>>);

    impl UnitSource for MapSource {
        fn fetch(&self, name: &LogicalName) -> Result<Option<Vec<u8>>, ScopeError> {
            Ok(self.0.get(name).cloned())
        }
    }

    fn name(s: &str) -> LogicalName {
        LogicalName::parse(s).unwrap()
    }

    fn bytes(image: &UnitImage) -> Vec<u8> {
        image.encode().unwrap()
    }

    fn arena_with(source: Vec<UnitImage>) -> ScopeArena {
        let map = source.iter().map(|i| (i.name.clone(), bytes(i))).collect();
        ScopeArena::new(TypeSpace::new(), Arc::new(MapSource(map)))
    }

    fn user_vo() -> UnitImage {
        UnitImage::new(name("demo.vo.UserVo"))
    }

    fn user_service() -> UnitImage {
        UnitImage::new(name("demo.service.UserService")).with_shape(TypeShape::Interface)
    }

    fn user_service_impl() -> UnitImage {
        UnitImage::new(name("demo.service.impl.UserServiceImpl"))
            .with_stereotype(Stereotype::Service)
            .extending(name("demo.service.UserService"))
            .with_injected("userVo", name("demo.vo.UserVo"))
    }

    fn seeded() -> ScopeArena {
        let mut arena = arena_with(Vec::new());
        for image in [user_vo(), user_service(), user_service_impl()] {
            arena
                .define_local(ScopeId::ROOT, &image.name.clone(), &bytes(&image))
                .unwrap();
        }
        arena
    }

    #[test]
    fn test_resolution_order() {
        let mut arena = seeded();
        let root_impl = arena.space().get(&user_service_impl().name).unwrap();
        let root_vo = arena.space().get(&user_vo().name).unwrap();

        let owner = user_service_impl().name;
        let scope = arena.child(ScopeId::ROOT, Some(owner.clone()));
        let local = arena
            .define_local(scope, &owner, &bytes(&user_service_impl()))
            .unwrap();

        assert_ne!(local.id, root_impl.id);
        assert_eq!(arena.load(scope, &owner).unwrap().id, local.id);
        assert_eq!(arena.load(scope, &user_vo().name).unwrap().id, root_vo.id);
        assert_eq!(arena.load(ScopeId::ROOT, &owner).unwrap().id, root_impl.id);
        assert_eq!(local.fields[0].ty.id, root_vo.id);
    }

    #[test]
    fn test_new_definition_not_assignable_to_old() {
        let mut arena = seeded();
        let root_service = arena.space().get(&user_service().name).unwrap();
        let owner = user_service().name;
        let scope = arena.child(ScopeId::ROOT, Some(owner.clone()));
        let local = arena.define_local(scope, &owner, &bytes(&user_service())).unwrap();

        assert!(!local.is_assignable_to(&root_service));
    }

    #[test]
    fn test_second_definition_rejected() {
        let mut arena = seeded();
        let owner = user_service_impl().name;
        let scope = arena.child(ScopeId::ROOT, Some(owner.clone()));
        let first = arena
            .define_local(scope, &owner, &bytes(&user_service_impl()))
            .unwrap();

        let result = arena.define_local(scope, &owner, &bytes(&user_service_impl()));
        assert!(matches!(result, Err(ScopeError::AlreadyDefined { .. })));
        assert_eq!(arena.find_loaded(scope, &owner).unwrap().id, first.id);
    }

    #[test]
    fn test_scope_bound_to_one_name() {
        let mut arena = seeded();
        let scope = arena.child(ScopeId::ROOT, Some(user_service_impl().name));
        let result = arena.define_local(scope, &user_vo().name, &bytes(&user_vo()));
        assert!(matches!(result, Err(ScopeError::ForeignName { .. })));
        assert!(arena.find_loaded(scope, &user_vo().name).is_none());
    }

    #[test]
    fn test_forward_reference_defined_in_parent() {
        let new_vo = UnitImage::new(name("demo.vo.AuditVo"));
        let mut arena = arena_with(vec![new_vo.clone()]);
        let service = UnitImage::new(name("demo.service.AuditService"))
            .with_injected("auditVo", new_vo.name.clone());

        let scope = arena.child(ScopeId::ROOT, Some(service.name.clone()));
        let handle = arena
            .define_local(scope, &service.name, &bytes(&service))
            .unwrap();

        let parent_vo = arena.space().get(&new_vo.name).unwrap();
        assert_eq!(handle.fields[0].ty.id, parent_vo.id);
        assert!(arena.find_loaded(scope, &new_vo.name).is_none());
    }

    #[test]
    fn test_fetched_reference_keeps_identity_as_unit() {
        let new_vo = UnitImage::new(name("demo.vo.AuditVo"));
        let mut arena = arena_with(vec![new_vo.clone()]);
        let service = UnitImage::new(name("demo.service.AuditService"))
            .with_injected("auditVo", new_vo.name.clone());

        let service_scope = arena.child(ScopeId::ROOT, Some(service.name.clone()));
        let handle = arena
            .define_unit(service_scope, &service.name, &bytes(&service))
            .unwrap();

        let vo_scope = arena.child(ScopeId::ROOT, Some(new_vo.name.clone()));
        let vo = arena.define_unit(vo_scope, &new_vo.name, &bytes(&new_vo)).unwrap();
        assert_eq!(handle.fields[0].ty.id, vo.id);
    }

    #[test]
    fn test_forward_reference_without_bytes_is_fatal() {
        let mut arena = arena_with(Vec::new());
        let service = UnitImage::new(name("demo.service.AuditService"))
            .with_injected("auditVo", name("demo.vo.Ghost"));
        let scope = arena.child(ScopeId::ROOT, Some(service.name.clone()));

        let result = arena.define_local(scope, &service.name, &bytes(&service));
        assert!(matches!(result, Err(ScopeError::MissingBytes { name }) if name.as_str() == "demo.vo.Ghost"));
    }

    #[test]
    fn test_cyclic_forward_references() {
        let a = UnitImage::new(name("demo.A")).with_injected("b", name("demo.B"));
        let b = UnitImage::new(name("demo.B")).with_injected("a", name("demo.A"));
        let mut arena = arena_with(vec![a.clone(), b]);

        let result = arena.define_local(ScopeId::ROOT, &a.name, &bytes(&a));
        assert!(matches!(result, Err(ScopeError::CyclicReference { .. })));
    }

    #[test]
    fn test_name_mismatch() {
        let mut arena = arena_with(Vec::new());
        let result = arena.define_local(ScopeId::ROOT, &name("demo.Other"), &bytes(&user_vo()));
        assert!(matches!(result, Err(ScopeError::NameMismatch { .. })));
    }

    #[test]
    fn test_parent_policy_shares_identity() {
        let mut arena = seeded().with_policy(ParentPolicy::new(["demo.vo"]));
        let vo = user_vo().name;
        let root_vo = arena.space().get(&vo).unwrap();

        let first = arena.child(ScopeId::ROOT, Some(vo.clone()));
        let second = arena.child(ScopeId::ROOT, Some(vo.clone()));
        let a = arena.define_unit(first, &vo, &bytes(&user_vo())).unwrap();
        let b = arena.define_unit(second, &vo, &bytes(&user_vo())).unwrap();

        assert_eq!(a.id, root_vo.id);
        assert_eq!(b.id, root_vo.id);
    }

    #[test]
    fn test_define_unit_isolates_existing_names() {
        let mut arena = seeded();
        let vo = user_vo().name;
        let root_vo = arena.space().get(&vo).unwrap();

        let scope = arena.child(ScopeId::ROOT, Some(vo.clone()));
        let local = arena.define_unit(scope, &vo, &bytes(&user_vo())).unwrap();
        assert_ne!(local.id, root_vo.id);
    }

    #[test]
    fn test_define_unit_places_new_names_in_parent() {
        let mut arena = seeded();
        let fresh = UnitImage::new(name("demo.service.impl.ReportServiceImpl"));
        let scope = arena.child(ScopeId::ROOT, Some(fresh.name.clone()));

        let handle = arena.define_unit(scope, &fresh.name, &bytes(&fresh)).unwrap();
        assert_eq!(arena.space().get(&fresh.name).unwrap().id, handle.id);
        assert_eq!(arena.load(scope, &fresh.name).unwrap().id, handle.id);
    }

    #[test]
    fn test_define_in_parent_already_satisfied() {
        let mut arena = seeded();
        let vo = user_vo().name;
        let before = arena.space().get(&vo).unwrap();
        let scope = arena.child(ScopeId::ROOT, None);

        let again = arena.define_in_parent(scope, &vo, &bytes(&user_vo())).unwrap();
        assert_eq!(again.id, before.id);
    }

    #[test]
    fn test_staged_bytes_defined_on_demand() {
        let mut arena = seeded();
        let owner = user_service_impl().name;
        let scope = arena.child(ScopeId::ROOT, None);
        let staged = UnitImage::new(name("demo.job.NightlyJob"));
        arena.stage(scope, staged.name.clone(), bytes(&staged));

        let loaded = arena.load(scope, &staged.name).unwrap();
        assert_eq!(loaded.scope, scope);
        assert!(arena.space().get(&staged.name).is_none());
        assert!(matches!(
            arena.load(scope, &name("demo.job.Unknown")),
            Err(ScopeError::NotFound { .. })
        ));
        assert!(arena.load(scope, &owner).is_ok());
    }

    #[test]
    fn test_directory_source_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(source.fetch(&name("demo.Nothing")).unwrap().is_none());

        let path = source.path_for(&name("demo.Something"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{}").unwrap();
        assert_eq!(source.fetch(&name("demo.Something")).unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_policy_prefix_boundary() {
        let policy = ParentPolicy::new(["demo.vo"]);
        assert!(policy.forces_parent(&name("demo.vo.UserVo")));
        assert!(policy.forces_parent(&name("demo.vo.inner.Deep")));
        assert!(!policy.forces_parent(&name("demo.vox.UserVo")));
    }

    proptest::proptest! {
        #[test]
        fn test_policy_only_matches_whole_segments(
            ns in "[a-z]{1,6}",
            suffix in "[a-z]{1,4}",
            simple in "[A-Z][a-z]{0,6}",
        ) {
            let policy = ParentPolicy::new([format!("demo.{ns}")]);
            let inside = name(&format!("demo.{ns}.{simple}"));
            let sibling = name(&format!("demo.{ns}{suffix}.{simple}"));
            proptest::prop_assert!(policy.forces_parent(&inside));
            proptest::prop_assert!(!policy.forces_parent(&sibling));
        }
    }
}
