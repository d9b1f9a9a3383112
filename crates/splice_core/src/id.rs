//! Identifiers for SPLICE entities.
//!
//! Run and object ids are random UUIDs. Definition ids are process-wide
//! counters: every loaded definition gets a fresh one, so two loads of the
//! same logical name never share an identity.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Run identifier - identifies a single hot-replacement run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run_{}", self.0)
    }
}

/// Object identifier - identifies a managed object instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Create a new random ObjectId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj_{}", self.0)
    }
}

static NEXT_DEFINITION: AtomicU64 = AtomicU64::new(1);

/// Definition identifier - the internal version of one loaded type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionId(u64);

impl DefinitionId {
    /// Allocate the next definition id
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_DEFINITION.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "def#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        assert_ne!(RunId::new(), RunId::new());
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn test_id_display() {
        assert!(RunId::new().to_string().starts_with("run_"));
        assert!(ObjectId::new().to_string().starts_with("obj_"));
    }

    #[test]
    fn test_definition_ids_are_monotonic() {
        let a = DefinitionId::next();
        let b = DefinitionId::next();
        assert!(b > a);
        assert!(a.to_string().starts_with("def#"));
    }
}
