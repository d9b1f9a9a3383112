//! Engine configuration.
//!
//! Mirrors the options an operator sets on a live process: the feature gate,
//! where replacement units live, and which namespaces must be shared with the
//! application scope instead of being loaded per unit.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the contract-to-implementation mapping file
pub const DEFAULT_MAPPING_FILE: &str = "splice-class-map.properties";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// A setting has an invalid value
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// Why it is invalid
        reason: String,
    },
}

/// Hot-replacement configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpliceConfig {
    /// Gate for the whole feature
    pub enabled: bool,
    /// Directory holding replacement units, laid out by namespace
    pub source_root: PathBuf,
    /// Base namespace of the application (informational)
    pub base_namespace: Option<String>,
    /// Namespaces whose units are defined in the parent scope
    pub parent_scope_namespaces: Vec<String>,
    /// Name of the optional mapping file under the source root
    pub mapping_file: String,
    /// Generate replacements for independent units in parallel
    pub parallel_generation: bool,
}

impl SpliceConfig {
    /// Create an enabled config for a source root
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            source_root: source_root.into(),
            ..Self::default()
        }
    }

    /// Load config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or fails validation
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings for consistency
    ///
    /// # Errors
    ///
    /// Returns error on an empty source root, an empty mapping file name, or a
    /// malformed parent-scope namespace
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.source_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "source_root",
                reason: "must be set when enabled".to_string(),
            });
        }
        if self.mapping_file.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "mapping_file",
                reason: "must not be empty".to_string(),
            });
        }
        for ns in &self.parent_scope_namespaces {
            let ns = ns.trim_end_matches('.');
            if ns.is_empty() || ns.split('.').any(str::is_empty) {
                return Err(ConfigError::Invalid {
                    field: "parent_scope_namespaces",
                    reason: format!("malformed namespace '{}'", ns),
                });
            }
        }
        Ok(())
    }

    /// Set the enable flag
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the base namespace
    #[must_use]
    pub fn with_base_namespace(mut self, ns: impl Into<String>) -> Self {
        self.base_namespace = Some(ns.into());
        self
    }

    /// Add a namespace that must be defined in the parent scope
    #[must_use]
    pub fn with_parent_scope_namespace(mut self, ns: impl Into<String>) -> Self {
        self.parent_scope_namespaces.push(ns.into());
        self
    }

    /// Enable/disable parallel generation
    #[must_use]
    pub fn with_parallel_generation(mut self, parallel: bool) -> Self {
        self.parallel_generation = parallel;
        self
    }

    /// Full path of the mapping file
    #[must_use]
    pub fn mapping_file_path(&self) -> PathBuf {
        self.source_root.join(&self.mapping_file)
    }
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_root: PathBuf::new(),
            base_namespace: None,
            parent_scope_namespaces: Vec::new(),
            mapping_file: DEFAULT_MAPPING_FILE.to_string(),
            parallel_generation: false,
        }
    }
}
