//! SPLICE Engine
//!
//! Hot replacement of components in a running application. A run discovers
//! replacement units under a source root, loads each in its own scope,
//! produces a replacement through the generator chain and finally points
//! the replacements' dependencies at each other.
//!
//! ```text
//! discover -> load -> generate (mapper | endpoint | generic) -> rewire
//! ```
//!
//! Replaced objects are not registered back in the container. Callers reach
//! them through the rewired graph, the endpoint registry, or the run report.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod endpoint;
pub mod error;
pub mod generator;
pub mod generic;
pub mod mapper;
pub mod mapping;
pub mod orchestrator;
pub mod rewire;

pub use application::{load_config, Application, CONFIG_FILE, PATCHES_DIR, TYPES_DIR};
pub use endpoint::EndpointGenerator;
pub use error::{BootError, GenerateError, HotPatchError, RewireError};
pub use generator::{GeneratorChain, Replacement, ReplacementGenerator};
pub use generic::GenericGenerator;
pub use mapper::MapperGenerator;
pub use mapping::ImplementationMap;
pub use orchestrator::{HotPatch, HotPatchReport, UnitOutcome, UnitReport};
pub use rewire::{
    derived_field_name, AssignedEdge, ConventionalImplNaming, DependencyEdge, NamingStrategy,
    NoNamingFallback, Resolution, Rewirer,
};
