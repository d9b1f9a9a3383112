//! Managed objects.

use crate::error::ContainerError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use splice_core::ObjectId;
use splice_scope::{MethodBody, TypeHandle};
use std::fmt;
use std::sync::Arc;

/// Shared reference to a managed object
pub type ObjectRef = Arc<ManagedObject>;

/// Behavior behind a proxy object
pub trait ProxyHandler: Send + Sync + fmt::Debug {
    /// Handle a call made on the proxy
    ///
    /// # Errors
    ///
    /// Returns error if the call cannot be served
    fn invoke(&self, target: &ManagedObject, method: &str) -> Result<String, ContainerError>;
}

/// What executes a managed object's methods
#[derive(Debug, Clone)]
pub enum Backing {
    /// Method bodies of the object's own type
    Instance,
    /// A proxy handler, for types with no implementation of their own
    Proxy(Arc<dyn ProxyHandler>),
}

/// An object owned by the container
pub struct ManagedObject {
    id: ObjectId,
    slot: Option<String>,
    ty: TypeHandle,
    backing: Backing,
    fields: RwLock<IndexMap<String, Option<ObjectRef>>>,
}

impl ManagedObject {
    /// Create an unpopulated instance of a type
    #[must_use]
    pub fn instance(ty: TypeHandle, slot: Option<String>) -> Self {
        Self::with_backing(ty, slot, Backing::Instance)
    }

    /// Create a proxy object for a type
    #[must_use]
    pub fn proxy(ty: TypeHandle, slot: Option<String>, handler: Arc<dyn ProxyHandler>) -> Self {
        Self::with_backing(ty, slot, Backing::Proxy(handler))
    }

    fn with_backing(ty: TypeHandle, slot: Option<String>, backing: Backing) -> Self {
        let fields = ty.fields.iter().map(|f| (f.name.clone(), None)).collect();
        Self {
            id: ObjectId::new(),
            slot,
            ty,
            backing,
            fields: RwLock::new(fields),
        }
    }

    /// Object id
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Container slot this object was configured against
    #[must_use]
    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Loaded type of this object
    #[must_use]
    pub fn ty(&self) -> &TypeHandle {
        &self.ty
    }

    /// Whether a proxy handler serves this object
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        matches!(self.backing, Backing::Proxy(_))
    }

    /// Current value of a field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<ObjectRef> {
        self.fields.read().get(name).cloned().flatten()
    }

    /// Snapshot of every field
    #[must_use]
    pub fn fields(&self) -> Vec<(String, Option<ObjectRef>)> {
        self.fields
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Point a field at another object, returning the previous value
    ///
    /// No type check is made; callers decide what is compatible.
    ///
    /// # Errors
    ///
    /// Returns error if the type declares no such field
    pub fn set_field(
        &self,
        name: &str,
        value: ObjectRef,
    ) -> Result<Option<ObjectRef>, ContainerError> {
        let mut fields = self.fields.write();
        let slot = fields
            .get_mut(name)
            .ok_or_else(|| ContainerError::UnknownField {
                owner: self.ty.name.clone(),
                field: name.to_string(),
            })?;
        Ok(slot.replace(value))
    }

    /// Call a method
    ///
    /// # Errors
    ///
    /// Returns error if the method does not exist, has no body, delegates
    /// through an empty field, or the proxy handler fails
    pub fn invoke(&self, method: &str) -> Result<String, ContainerError> {
        if let Backing::Proxy(handler) = &self.backing {
            return handler.invoke(self, method);
        }

        let def = self
            .ty
            .find_method(method)
            .ok_or_else(|| ContainerError::NoSuchMethod {
                ty: self.ty.name.clone(),
                method: method.to_string(),
            })?;
        match &def.body {
            Some(MethodBody::Literal(value)) => Ok(value.clone()),
            Some(MethodBody::Delegate { field, method }) => {
                let target = self.field(field).ok_or_else(|| ContainerError::UnwiredField {
                    owner: self.ty.name.clone(),
                    field: field.clone(),
                })?;
                target.invoke(method)
            }
            None => Err(ContainerError::NoBody {
                ty: self.ty.name.clone(),
                method: method.to_string(),
            }),
        }
    }
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedObject")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("ty", &self.ty.name)
            .field("proxy", &self.is_proxy())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ty.name, self.id)
    }
}
