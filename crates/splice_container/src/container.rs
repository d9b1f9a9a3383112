//! In-memory object container.
//!
//! Objects are registered under a name and populated by type: an injectable
//! field receives the single registered object assignable to its type, or
//! among several, the one registered under the field's own name.

use crate::error::ContainerError;
use crate::factory::{ObjectFactory, Wiring};
use crate::object::{ManagedObject, ObjectRef, ProxyHandler};
use indexmap::IndexMap;
use parking_lot::RwLock;
use splice_scope::{FieldDef, TypeHandle};
use std::sync::Arc;
use tracing::{debug, trace};

/// In-memory container of named singletons
#[derive(Debug, Default)]
pub struct Container {
    objects: RwLock<IndexMap<String, ObjectRef>>,
}

impl Container {
    /// Create an empty container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing object under a name
    ///
    /// # Errors
    ///
    /// Returns error if the name is taken
    pub fn register(&self, name: &str, object: ObjectRef) -> Result<(), ContainerError> {
        let mut objects = self.objects.write();
        if objects.contains_key(name) {
            return Err(ContainerError::DuplicateObject {
                name: name.to_string(),
            });
        }
        debug!(object = name, ty = %object.ty().name, "registered object");
        objects.insert(name.to_string(), object);
        Ok(())
    }

    /// Register an unpopulated singleton of `ty`
    ///
    /// # Errors
    ///
    /// Returns error if the type cannot be instantiated or the name is taken
    pub fn register_singleton(&self, name: &str, ty: TypeHandle) -> Result<ObjectRef, ContainerError> {
        ensure_instantiable(&ty)?;
        let object = Arc::new(ManagedObject::instance(ty, Some(name.to_string())));
        self.register(name, object.clone())?;
        Ok(object)
    }

    /// Register a proxy object for `ty`
    ///
    /// # Errors
    ///
    /// Returns error if the name is taken
    pub fn register_proxy(
        &self,
        name: &str,
        ty: TypeHandle,
        handler: Arc<dyn ProxyHandler>,
    ) -> Result<ObjectRef, ContainerError> {
        let object = Arc::new(ManagedObject::proxy(ty, Some(name.to_string()), handler));
        self.register(name, object.clone())?;
        Ok(object)
    }

    /// Populate every registered instance
    ///
    /// Returns the number of fields injected.
    ///
    /// # Errors
    ///
    /// Returns the first unsatisfied or ambiguous dependency
    pub fn populate_all(&self) -> Result<usize, ContainerError> {
        let snapshot = self.snapshot();
        let mut injected = 0;
        for (name, object) in &snapshot {
            if object.is_proxy() {
                continue;
            }
            injected += populate(object, &snapshot, Some(name.as_str()), None, Wiring::Complete)?;
        }
        debug!(objects = snapshot.len(), injected, "populated container");
        Ok(injected)
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Number of registered objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn snapshot(&self) -> Vec<(String, ObjectRef)> {
        self.objects
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl ObjectFactory for Container {
    fn contains_object(&self, name: &str) -> bool {
        self.objects.read().contains_key(name)
    }

    fn object(&self, name: &str) -> Option<ObjectRef> {
        self.objects.read().get(name).cloned()
    }

    fn configure_object(
        &self,
        ty: &TypeHandle,
        name: &str,
        wiring: Wiring,
    ) -> Result<ObjectRef, ContainerError> {
        ensure_instantiable(ty)?;
        let existing = self.object(name).ok_or_else(|| ContainerError::UnknownObject {
            name: name.to_string(),
        })?;

        let object = ManagedObject::instance(ty.clone(), Some(name.to_string()));
        populate(&object, &self.snapshot(), Some(name), Some(&existing), wiring)?;
        trace!(object = name, ty = %ty, "configured object against slot");
        Ok(Arc::new(object))
    }

    fn create_object(&self, ty: &TypeHandle, wiring: Wiring) -> Result<ObjectRef, ContainerError> {
        ensure_instantiable(ty)?;
        let object = ManagedObject::instance(ty.clone(), None);
        populate(&object, &self.snapshot(), None, None, wiring)?;
        trace!(ty = %ty, "created object");
        Ok(Arc::new(object))
    }

    fn evict_object(&self, name: &str) -> Option<ObjectRef> {
        let evicted = self.objects.write().shift_remove(name);
        if evicted.is_some() {
            debug!(object = name, "evicted object");
        }
        evicted
    }
}

fn ensure_instantiable(ty: &TypeHandle) -> Result<(), ContainerError> {
    if ty.shape.is_instantiable() {
        Ok(())
    } else {
        Err(ContainerError::NotInstantiable {
            ty: ty.name.clone(),
        })
    }
}

/// Fill the empty injectable fields of `object` from `candidates`
///
/// `exclude` keeps the object's own slot out of the candidates. A field with
/// no candidate takes the value `previous` holds for it, if any; failing
/// that it is an error, or stays empty under [`Wiring::Deferred`].
fn populate(
    object: &ManagedObject,
    candidates: &[(String, ObjectRef)],
    exclude: Option<&str>,
    previous: Option<&ObjectRef>,
    wiring: Wiring,
) -> Result<usize, ContainerError> {
    let mut injected = 0;
    for field in object.ty().injectable_fields() {
        if object.field(&field.name).is_some() {
            continue;
        }
        let value = match resolve(object, field, candidates, exclude)? {
            Some(value) => value,
            None => match previous.and_then(|p| p.field(&field.name)) {
                Some(value) => value,
                None if wiring == Wiring::Deferred => {
                    trace!(
                        owner = %object.ty().name,
                        field = %field.name,
                        "field left for rewiring"
                    );
                    continue;
                }
                None => {
                    return Err(ContainerError::UnsatisfiedDependency {
                        owner: object.ty().name.clone(),
                        field: field.name.clone(),
                        ty: field.ty.name.clone(),
                    });
                }
            },
        };
        object.set_field(&field.name, value)?;
        injected += 1;
    }
    Ok(injected)
}

fn resolve(
    object: &ManagedObject,
    field: &FieldDef,
    candidates: &[(String, ObjectRef)],
    exclude: Option<&str>,
) -> Result<Option<ObjectRef>, ContainerError> {
    let matching: Vec<&(String, ObjectRef)> = candidates
        .iter()
        .filter(|(name, _)| Some(name.as_str()) != exclude)
        .filter(|(_, candidate)| candidate.ty().is_assignable_to(&field.ty))
        .collect();

    match matching.as_slice() {
        [] => Ok(None),
        [(_, only)] => Ok(Some(only.clone())),
        many => many
            .iter()
            .find(|(name, _)| *name == field.name)
            .map(|(_, named)| Some(named.clone()))
            .ok_or_else(|| ContainerError::AmbiguousCandidates {
                owner: object.ty().name.clone(),
                field: field.name.clone(),
                candidates: many.iter().map(|(name, _)| name.clone()).collect(),
            }),
    }
}
