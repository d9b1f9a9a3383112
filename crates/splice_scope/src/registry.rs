//! Discovery of replacement units under a source root.

use crate::error::ScopeError;
use crate::image::{self, UnitImage};
use crate::scope::{DirectorySource, ParentPolicy, ScopeArena, ScopeId, TypeSpace};
use crate::types::{TypeHandle, UnitCategory};
use indexmap::{IndexMap, IndexSet};
use splice_core::{LogicalName, SpliceConfig, UNIT_EXTENSION};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One discovered replacement unit
#[derive(Debug, Clone)]
pub struct ReplacementUnit {
    /// Logical name derived from the unit's path
    pub name: LogicalName,
    /// Unit file
    pub path: PathBuf,
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Content digest of the bytes
    pub digest: String,
    /// Scope created for this unit
    pub scope: ScopeId,
    /// Dispatch category
    pub category: UnitCategory,
}

/// Registry of the units discovered for one run
pub struct ScopeRegistry {
    source_root: PathBuf,
    arena: ScopeArena,
    units: IndexMap<LogicalName, ReplacementUnit>,
    loaded: IndexMap<LogicalName, TypeHandle>,
    rejected: Vec<(LogicalName, ScopeError)>,
}

impl ScopeRegistry {
    /// Walk the configured source root and give every unit its own scope
    ///
    /// Units are visited in sorted path order. A unit whose image cannot be
    /// decoded is rejected on its own; it stays scheduled but never loads.
    ///
    /// # Errors
    ///
    /// Returns error if the source root is missing or unreadable, or a unit
    /// file cannot be mapped to a logical name
    pub fn discover(config: &SpliceConfig, space: TypeSpace) -> Result<Self, ScopeError> {
        let root = config.source_root.clone();
        let policy = ParentPolicy::new(config.parent_scope_namespaces.iter().cloned());
        let mut arena =
            ScopeArena::new(space, Arc::new(DirectorySource::new(&root))).with_policy(policy);

        let mut units = IndexMap::new();
        let mut rejected = Vec::new();
        for path in collect_unit_files(&root)? {
            let name = unit_name(&root, &path)?;
            let bytes = read_unit(&path)?;

            let category = match UnitImage::decode(&bytes) {
                Ok(image) => UnitCategory::classify(image.shape, &image.stereotypes),
                Err(source) => {
                    warn!(unit = %name, error = %source, "rejecting undecodable unit");
                    rejected.push((name.clone(), ScopeError::Image { name, source }));
                    continue;
                }
            };

            let scope = arena.child(ScopeId::ROOT, Some(name.clone()));
            debug!(unit = %name, scope = %scope, category = %category, "discovered unit");
            units.insert(
                name.clone(),
                ReplacementUnit {
                    digest: image::digest(&bytes),
                    name,
                    path,
                    bytes,
                    scope,
                    category,
                },
            );
        }

        info!(
            root = %root.display(),
            units = units.len(),
            rejected = rejected.len(),
            "discovered replacement units"
        );
        Ok(Self {
            source_root: root,
            arena,
            units,
            loaded: IndexMap::new(),
            rejected,
        })
    }

    /// Loaded type of a discovered unit, defining it on first request
    ///
    /// # Errors
    ///
    /// Returns `UnitNotFound` for a name that was not discovered, or the
    /// definition error of the unit
    pub fn load(&mut self, name: &LogicalName) -> Result<TypeHandle, ScopeError> {
        if let Some(ty) = self.loaded.get(name) {
            return Ok(ty.clone());
        }
        let unit = self
            .units
            .get(name)
            .ok_or_else(|| ScopeError::UnitNotFound { name: name.clone() })?;

        let ty = self.arena.define_unit(unit.scope, name, &unit.bytes)?;
        self.loaded.insert(name.clone(), ty.clone());
        Ok(ty)
    }

    /// Discovered unit by name
    #[must_use]
    pub fn unit(&self, name: &LogicalName) -> Option<&ReplacementUnit> {
        self.units.get(name)
    }

    /// Discovered units in discovery order
    pub fn units(&self) -> impl Iterator<Item = &ReplacementUnit> {
        self.units.values()
    }

    /// Every name scheduled for replacement, rejected units included
    #[must_use]
    pub fn scheduled(&self) -> IndexSet<LogicalName> {
        self.units
            .keys()
            .cloned()
            .chain(self.rejected.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    /// Units rejected during discovery
    #[must_use]
    pub fn rejected(&self) -> &[(LogicalName, ScopeError)] {
        &self.rejected
    }

    /// Scope arena of this run
    #[must_use]
    pub fn arena(&self) -> &ScopeArena {
        &self.arena
    }

    /// Source root that was walked
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Number of discovered units
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if no unit was discovered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("source_root", &self.source_root)
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .field("rejected", &self.rejected.len())
            .finish_non_exhaustive()
    }
}

impl TypeSpace {
    /// Define every unit under `dir` as a root type
    ///
    /// Returns the number of units visited.
    ///
    /// # Errors
    ///
    /// Returns the first discovery or definition error
    pub fn load_directory(&self, dir: &Path) -> Result<usize, ScopeError> {
        let files = collect_unit_files(dir)?;
        let mut arena = ScopeArena::new(self.clone(), Arc::new(DirectorySource::new(dir)));
        for path in &files {
            let name = unit_name(dir, path)?;
            let bytes = read_unit(path)?;
            arena.define_in_parent(ScopeId::ROOT, &name, &bytes)?;
        }
        debug!(dir = %dir.display(), types = self.len(), "loaded type space");
        Ok(files.len())
    }
}

/// Unit files under `root`, in sorted path order
fn collect_unit_files(root: &Path) -> Result<Vec<PathBuf>, ScopeError> {
    let meta = std::fs::metadata(root).map_err(|source| ScopeError::SourceRoot {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScopeError::SourceRoot {
            path: root.to_path_buf(),
            source: std::io::Error::other("not a directory"),
        });
    }

    let mut files = Vec::new();
    walk(root, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), ScopeError> {
    let io_err = |source: std::io::Error| ScopeError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        if entry.file_type().map_err(io_err)?.is_dir() {
            walk(&path, files)?;
        } else if path.extension() == Some(OsStr::new(UNIT_EXTENSION)) {
            files.push(path);
        }
    }
    Ok(())
}

fn unit_name(root: &Path, path: &Path) -> Result<LogicalName, ScopeError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ScopeError::Unlocatable {
            path: path.to_path_buf(),
            reason: format!("not under {}", root.display()),
        })?;
    LogicalName::from_relative_path(relative, UNIT_EXTENSION).map_err(|e| ScopeError::Unlocatable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn read_unit(path: &Path) -> Result<Vec<u8>, ScopeError> {
    std::fs::read(path).map_err(|source| ScopeError::Io {
        path: path.to_path_buf(),
        source,
    })
}
