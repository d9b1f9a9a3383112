//! A bootable demo application.
//!
//! An application directory holds its root types and optional settings:
//!
//! ```text
//! app/
//!   splice.json        settings, optional
//!   types/             root units plus mapper descriptors
//!   patches/           default source root for replacement units
//! ```
//!
//! Booting registers one object per instantiable root type, a proxy per
//! mapper, populates the container, binds every handler route and wires a
//! [`HotPatch`] trigger over the result.

use crate::error::{BootError, HotPatchError};
use crate::orchestrator::{HotPatch, HotPatchReport};
use splice_catalog::{MapperLoader, MapperProxy, MappingCatalog, SharedCatalog};
use splice_container::{Container, ObjectRef, StaticContext};
use splice_core::SpliceConfig;
use splice_endpoint::{EndpointError, SharedEndpointRegistry};
use splice_scope::{HttpVerb, TypeSpace, UnitCategory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Settings file name inside an application directory
pub const CONFIG_FILE: &str = "splice.json";

/// Root types directory inside an application directory
pub const TYPES_DIR: &str = "types";

/// Default source root inside an application directory
pub const PATCHES_DIR: &str = "patches";

/// A running application with its container, routes and catalog
pub struct Application {
    dir: PathBuf,
    space: TypeSpace,
    container: Arc<Container>,
    endpoints: SharedEndpointRegistry,
    catalog: SharedCatalog,
    hot_patch: HotPatch,
}

impl Application {
    /// Boot the application in `dir`
    ///
    /// # Errors
    ///
    /// Returns error if the settings are invalid, a root type cannot be
    /// loaded, the container cannot be populated, a route is bound twice, or
    /// a mapper cannot be parsed
    pub fn boot(dir: &Path) -> Result<Self, BootError> {
        let config = load_config(dir)?;
        Self::boot_with(dir, config)
    }

    /// Boot the application in `dir` with explicit settings
    ///
    /// # Errors
    ///
    /// Same as [`Application::boot`]
    pub fn boot_with(dir: &Path, config: SpliceConfig) -> Result<Self, BootError> {
        let types_dir = dir.join(TYPES_DIR);
        let space = TypeSpace::new();
        space.load_directory(&types_dir)?;

        let container = Arc::new(Container::new());
        let endpoints = SharedEndpointRegistry::new();
        let catalog = SharedCatalog::new(MappingCatalog::new());
        let loader = MapperLoader::new(&types_dir);

        let mut handlers: Vec<ObjectRef> = Vec::new();
        for name in space.names() {
            let Some(ty) = space.get(&name) else {
                continue;
            };
            let slot = name.object_name();
            match ty.category() {
                UnitCategory::PersistenceMapper => {
                    let factory = loader.install(&mut catalog.write(), &ty)?;
                    let proxy = Arc::new(MapperProxy::new(catalog.clone(), factory));
                    container.register_proxy(&slot, ty, proxy)?;
                }
                UnitCategory::EndpointHandler => {
                    handlers.push(container.register_singleton(&slot, ty)?);
                }
                UnitCategory::Plain => {
                    container.register_singleton(&slot, ty)?;
                }
                UnitCategory::Uninstantiable => {
                    debug!(ty = %name, "not registering uninstantiable type");
                }
            }
        }

        let injected = container.populate_all()?;
        let mut routes = 0;
        for handler in &handlers {
            routes += endpoints.register_handler(handler)?;
        }
        catalog.write().mark_ready();

        let context = Arc::new(StaticContext::new(container.clone()));
        let hot_patch = HotPatch::new(config, context, space.clone())
            .with_endpoints(endpoints.clone())
            .with_catalog(catalog.clone());

        info!(
            app = %dir.display(),
            types = space.len(),
            objects = container.len(),
            injected,
            routes,
            "application booted"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            space,
            container,
            endpoints,
            catalog,
            hot_patch,
        })
    }

    /// Run a hot replacement against this application
    ///
    /// # Errors
    ///
    /// See [`HotPatch::execute`]
    pub fn patch(&self) -> Result<HotPatchReport, HotPatchError> {
        self.hot_patch.execute()
    }

    /// Call a route
    ///
    /// # Errors
    ///
    /// Returns error if nothing is bound or the call fails
    pub fn dispatch(&self, verb: HttpVerb, path: &str) -> Result<String, EndpointError> {
        self.endpoints.dispatch(verb, path)
    }

    /// Application directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Root types
    #[must_use]
    pub fn space(&self) -> &TypeSpace {
        &self.space
    }

    /// Hot-replacement trigger
    #[must_use]
    pub fn hot_patch(&self) -> &HotPatch {
        &self.hot_patch
    }

    /// Container
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Route registry
    #[must_use]
    pub fn endpoints(&self) -> &SharedEndpointRegistry {
        &self.endpoints
    }

    /// Mapping catalog
    #[must_use]
    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("dir", &self.dir)
            .field("types", &self.space.len())
            .field("objects", &self.container.len())
            .field("routes", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}

/// Settings of an application directory
///
/// A relative source root is taken relative to `dir`. Without a settings
/// file the feature is enabled over `dir/patches`.
///
/// # Errors
///
/// Returns error if the settings file exists but is invalid
pub fn load_config(dir: &Path) -> Result<SpliceConfig, BootError> {
    let path = dir.join(CONFIG_FILE);
    if !path.is_file() {
        return Ok(SpliceConfig::new(dir.join(PATCHES_DIR)));
    }
    let mut config = SpliceConfig::load(&path)?;
    if config.source_root.is_relative() {
        config.source_root = dir.join(&config.source_root);
    }
    Ok(config)
}
