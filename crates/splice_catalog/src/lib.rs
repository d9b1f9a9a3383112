//! SPLICE Mapping Catalog
//!
//! The persistence-mapping runtime keeps its behavior in a shared catalog:
//! statements, generated-key rules, result and parameter shapes and caches,
//! all keyed by `mapper.member` strings. Mapper objects are proxies that
//! look statements up by key and cache them per method.
//!
//! Replacing a mapper therefore means editing the catalog, not swapping an
//! object. [`CatalogSurgeon`] removes every entry derived from the old
//! definition and parses the new one back in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annotations;
pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod proxy;
pub mod surgeon;

pub use annotations::{AnnotationBuilder, MethodScope};
pub use catalog::{
    CacheConfig, CatalogState, CatalogTable, KeyGenerator, MappedStatement, MappingCatalog,
    ParameterMap, ResultMap, SharedCatalog,
};
pub use descriptor::{descriptor_resource, type_resource, MapperDescriptor, DESCRIPTOR_EXTENSION};
pub use error::CatalogError;
pub use proxy::{MapperProxy, MapperProxyFactory};
pub use surgeon::{prefix_matches, CatalogSurgeon, MapperLoader, SurgeryReport};
