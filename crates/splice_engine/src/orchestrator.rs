//! Hot-replacement run orchestration.
//!
//! A run goes through fixed stages: gate, container check, mapping file,
//! discovery, loading, generation, then rewiring once every replacement
//! exists. Unit-level failures are logged and listed in the report; anything
//! else aborts the run where it stands. Nothing applied before an abort is
//! rolled back.

use crate::endpoint::EndpointGenerator;
use crate::error::{GenerateError, HotPatchError};
use crate::generator::{GeneratorChain, Replacement};
use crate::mapper::MapperGenerator;
use crate::mapping::ImplementationMap;
use crate::rewire::{AssignedEdge, ConventionalImplNaming, NamingStrategy, Rewirer};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use splice_catalog::{CatalogSurgeon, MapperLoader, SharedCatalog};
use splice_container::{ApplicationContext, ObjectFactory, ObjectRef};
use splice_core::{LogicalName, ObjectId, RunId, SpliceConfig};
use splice_endpoint::SharedEndpointRegistry;
use splice_scope::{ReplacementUnit, ScopeRegistry, TypeHandle, TypeSpace, UnitCategory};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to one discovered unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// A replacement object was produced
    Replaced {
        /// The new object
        object: ObjectId,
    },
    /// Handled without an object
    Handled,
    /// Nothing to build for this shape
    NoObject,
    /// Failed on its own and left out of the run
    Skipped {
        /// Why
        reason: String,
    },
}

/// Report line for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Unit name
    pub name: LogicalName,
    /// Category, if the unit could be decoded
    pub category: Option<UnitCategory>,
    /// Outcome
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

/// Result of one hot-replacement run
#[derive(Debug, Clone, Serialize)]
pub struct HotPatchReport {
    /// Run id
    pub run_id: RunId,
    /// Whether the feature gate was open
    pub enabled: bool,
    /// Source root the units came from
    pub source_root: PathBuf,
    /// Per-unit outcomes in discovery order
    pub units: Vec<UnitReport>,
    /// Edges pointed at replacements
    pub rewired: Vec<AssignedEdge>,
    #[serde(skip)]
    replacements: IndexMap<LogicalName, ObjectRef>,
}

impl HotPatchReport {
    fn new(run_id: RunId, config: &SpliceConfig) -> Self {
        Self {
            run_id,
            enabled: config.enabled,
            source_root: config.source_root.clone(),
            units: Vec::new(),
            rewired: Vec::new(),
            replacements: IndexMap::new(),
        }
    }

    /// Outcome of a unit
    #[must_use]
    pub fn outcome(&self, name: &LogicalName) -> Option<&UnitOutcome> {
        self.units.iter().find(|u| &u.name == name).map(|u| &u.outcome)
    }

    /// Replacement object produced for a unit
    #[must_use]
    pub fn replacement(&self, name: &LogicalName) -> Option<&ObjectRef> {
        self.replacements.get(name)
    }

    /// Units left out of the run
    pub fn skipped(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|u| matches!(u.outcome, UnitOutcome::Skipped { .. }))
    }

    /// Number of units that produced an object
    #[must_use]
    pub fn replaced_count(&self) -> usize {
        self.replacements.len()
    }
}

/// The hot-replacement trigger of one application
///
/// At most one run executes at a time; the object is meant to live as long
/// as the application and be shared by whoever triggers runs.
pub struct HotPatch {
    config: SpliceConfig,
    context: Arc<dyn ApplicationContext>,
    space: TypeSpace,
    endpoints: Option<SharedEndpointRegistry>,
    catalog: Option<SharedCatalog>,
    naming: Arc<dyn NamingStrategy>,
    running: Mutex<()>,
}

impl HotPatch {
    /// Create a trigger over an application's context and root types
    #[must_use]
    pub fn new(config: SpliceConfig, context: Arc<dyn ApplicationContext>, space: TypeSpace) -> Self {
        Self {
            config,
            context,
            space,
            endpoints: None,
            catalog: None,
            naming: Arc::new(ConventionalImplNaming),
            running: Mutex::new(()),
        }
    }

    /// Attach the live endpoint registry
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: SharedEndpointRegistry) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Attach the live mapping catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: SharedCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the naming fallback used by rewiring
    #[must_use]
    pub fn with_naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &SpliceConfig {
        &self.config
    }

    /// Run a hot replacement now
    ///
    /// # Errors
    ///
    /// Returns error if another run is in progress, the container cannot be
    /// driven, the configuration or source root is unusable, or the
    /// replacements cannot be rewired
    pub fn execute(&self) -> Result<HotPatchReport, HotPatchError> {
        let Some(_running) = self.running.try_lock() else {
            return Err(HotPatchError::RunInProgress);
        };
        let run_id = RunId::new();
        let mut report = HotPatchReport::new(run_id, &self.config);

        if !self.config.enabled {
            info!(run = %run_id, "hot replacement disabled");
            return Ok(report);
        }
        info!(run = %run_id, root = %self.config.source_root.display(), "hot replacement started");
        self.config.validate()?;

        let factory = self
            .context
            .object_factory()
            .ok_or(HotPatchError::UnsupportedContainer)?;
        let mapping = ImplementationMap::load(&self.config.mapping_file_path())?;

        let mut registry = ScopeRegistry::discover(&self.config, self.space.clone())?;
        let scheduled = registry.scheduled();
        for (name, error) in registry.rejected() {
            report.units.push(UnitReport {
                name: name.clone(),
                category: None,
                outcome: UnitOutcome::Skipped {
                    reason: error.to_string(),
                },
            });
        }

        let units: Vec<ReplacementUnit> = registry.units().cloned().collect();
        let mut loaded: Vec<(ReplacementUnit, TypeHandle)> = Vec::with_capacity(units.len());
        for unit in units {
            match registry.load(&unit.name) {
                Ok(ty) => loaded.push((unit, ty)),
                Err(e) if e.is_unit_local() => {
                    warn!(unit = %unit.name, error = %e, "skipping unit that failed to load");
                    report.units.push(UnitReport {
                        name: unit.name,
                        category: Some(unit.category),
                        outcome: UnitOutcome::Skipped { reason: e.to_string() },
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let chain = self.chain(factory);
        let generate = |(unit, ty): &(ReplacementUnit, TypeHandle)| chain.generate(unit, ty);
        let generated: Vec<Result<Option<Replacement>, GenerateError>> =
            if self.config.parallel_generation {
                loaded.par_iter().map(generate).collect()
            } else {
                loaded.iter().map(generate).collect()
            };

        let mut output = IndexMap::new();
        for ((unit, _), generated) in loaded.iter().zip(generated) {
            let outcome = match &generated {
                Ok(Some(Replacement::Object(object))) => {
                    report.replacements.insert(unit.name.clone(), object.clone());
                    UnitOutcome::Replaced { object: object.id() }
                }
                Ok(Some(Replacement::Handled)) => UnitOutcome::Handled,
                Ok(None) => UnitOutcome::NoObject,
                Err(e) => {
                    warn!(unit = %unit.name, error = %e, "skipping unit that failed to generate");
                    UnitOutcome::Skipped { reason: e.to_string() }
                }
            };
            report.units.push(UnitReport {
                name: unit.name.clone(),
                category: Some(unit.category),
                outcome,
            });
            if let Ok(Some(replacement)) = generated {
                output.insert(unit.name.clone(), replacement);
            }
        }

        let rewirer = Rewirer::new(mapping).with_naming(self.naming.clone());
        report.rewired = rewirer.rewire(&output, &scheduled)?;

        info!(
            run = %run_id,
            units = report.units.len(),
            replaced = report.replaced_count(),
            skipped = report.skipped().count(),
            rewired = report.rewired.len(),
            "hot replacement complete"
        );
        Ok(report)
    }

    fn chain(&self, factory: Arc<dyn ObjectFactory>) -> GeneratorChain {
        let mut chain = GeneratorChain::new(factory.clone());
        if let Some(endpoints) = &self.endpoints {
            chain = chain.with_endpoint(EndpointGenerator::new(factory, endpoints.clone()));
        }
        if let Some(catalog) = &self.catalog {
            let surgeon = CatalogSurgeon::new(MapperLoader::new(&self.config.source_root));
            chain = chain.with_mapper(MapperGenerator::new(catalog.clone(), surgeon));
        }
        chain
    }
}

impl std::fmt::Debug for HotPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotPatch")
            .field("config", &self.config)
            .field("endpoints", &self.endpoints.is_some())
            .field("catalog", &self.catalog.is_some())
            .field("naming", &self.naming)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_container::{Container, StaticContext};
    use splice_scope::{MethodImage, UnitImage};
    use std::path::Path;

    fn write_unit(root: &Path, image: &UnitImage) {
        let path = root.join(image.name.relative_path("unit"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, image.encode().unwrap()).unwrap();
    }

    fn greeter(root: &Path, name: &str) {
        write_unit(
            root,
            &UnitImage::new(LogicalName::parse(name).unwrap())
                .with_method(MethodImage::named("greet").returning("hi")),
        );
    }

    fn hot_patch(config: SpliceConfig) -> HotPatch {
        let context = Arc::new(StaticContext::new(Arc::new(Container::new())));
        HotPatch::new(config, context, TypeSpace::new())
    }

    #[test]
    fn test_disabled_run_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        greeter(dir.path(), "demo.Greeter");
        let report = hot_patch(SpliceConfig::new(dir.path()).with_enabled(false))
            .execute()
            .unwrap();
        assert!(!report.enabled);
        assert!(report.units.is_empty());
    }

    #[test]
    fn test_concurrent_run_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let hot_patch = hot_patch(SpliceConfig::new(dir.path()));
        let _held = hot_patch.running.lock();
        assert!(matches!(hot_patch.execute(), Err(HotPatchError::RunInProgress)));
    }

    #[test]
    fn test_unsupported_container() {
        let dir = tempfile::tempdir().unwrap();
        let hot_patch = HotPatch::new(
            SpliceConfig::new(dir.path()),
            Arc::new(StaticContext::unsupported()),
            TypeSpace::new(),
        );
        assert!(matches!(
            hot_patch.execute(),
            Err(HotPatchError::UnsupportedContainer)
        ));
    }

    #[test]
    fn test_missing_source_root_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let result = hot_patch(SpliceConfig::new(dir.path().join("absent"))).execute();
        assert!(matches!(result, Err(HotPatchError::Scope(_))));
    }

    #[test]
    fn test_new_units_are_created() {
        let dir = tempfile::tempdir().unwrap();
        greeter(dir.path(), "demo.a.Greeter");
        greeter(dir.path(), "demo.b.Greeter");

        let report = hot_patch(SpliceConfig::new(dir.path())).execute().unwrap();
        assert_eq!(report.replaced_count(), 2);
        let names: Vec<String> = report.units.iter().map(|u| u.name.to_string()).collect();
        assert_eq!(names, ["demo.a.Greeter", "demo.b.Greeter"]);
        let greeter = report
            .replacement(&LogicalName::parse("demo.b.Greeter").unwrap())
            .unwrap();
        assert_eq!(greeter.invoke("greet").unwrap(), "hi");
    }

    #[test]
    fn test_parallel_generation_keeps_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..8 {
            greeter(dir.path(), &format!("demo.g{}.Greeter", i));
        }
        let config = SpliceConfig::new(dir.path()).with_parallel_generation(true);
        let report = hot_patch(config).execute().unwrap();

        assert_eq!(report.replaced_count(), 8);
        for (i, unit) in report.units.iter().enumerate() {
            assert_eq!(unit.name.to_string(), format!("demo.g{}.Greeter", i));
            assert!(matches!(unit.outcome, UnitOutcome::Replaced { .. }));
        }
    }

    #[test]
    fn test_unreadable_mapping_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = SpliceConfig::new(dir.path());
        std::fs::create_dir_all(config.mapping_file_path()).unwrap();
        let result = hot_patch(config).execute();
        assert!(matches!(result, Err(HotPatchError::MappingFile { .. })));
    }
}
