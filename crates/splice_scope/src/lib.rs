//! SPLICE Loader Scopes
//!
//! Byte-level loading of replacement units into isolated scopes. Each unit
//! gets its own scope so a new version never collides with the live one,
//! while shared base types still resolve through the parent scope to a
//! single identity.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod image;
pub mod registry;
pub mod scope;
pub mod types;

pub use error::ScopeError;
pub use image::{
    FieldImage, HttpVerb, ImageError, MethodBody, MethodImage, RouteSpec, SelectKeySpec,
    StatementKind, StatementSpec, Stereotype, TypeShape, UnitImage,
};
pub use registry::{ReplacementUnit, ScopeRegistry};
pub use scope::{DirectorySource, ParentPolicy, ScopeArena, ScopeId, TypeSpace, UnitSource};
pub use types::{FieldDef, MethodDef, TypeDef, TypeHandle, UnitCategory};
