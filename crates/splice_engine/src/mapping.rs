//! Contract-to-implementation mapping file.
//!
//! A flat properties file under the source root:
//!
//! ```text
//! # comment
//! demo.service.UserService = demo.service.impl.UserServiceImpl
//! demo.repo.UserRepo: demo.repo.jdbc.JdbcUserRepo
//! ```

use crate::error::HotPatchError;
use indexmap::IndexMap;
use splice_core::LogicalName;
use std::path::Path;
use tracing::{debug, warn};

/// Contract names mapped to implementation names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImplementationMap {
    entries: IndexMap<LogicalName, LogicalName>,
}

impl ImplementationMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties text
    ///
    /// Lines starting with `#` or `!` are comments. Keys and values are
    /// separated by the first `=` or `:`. Lines that are not a valid pair of
    /// names are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = IndexMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                debug!(line = index + 1, "mapping line has no separator");
                continue;
            };
            match (LogicalName::parse(key.trim()), LogicalName::parse(value.trim())) {
                (Ok(contract), Ok(implementation)) => {
                    entries.insert(contract, implementation);
                }
                _ => warn!(line = index + 1, "skipping malformed mapping line"),
            }
        }
        Self { entries }
    }

    /// Read the mapping file, treating a missing file as empty
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read
    pub fn load(path: &Path) -> Result<Self, HotPatchError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let map = Self::parse(&text);
                debug!(path = %path.display(), entries = map.len(), "loaded mapping file");
                Ok(map)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no mapping file");
                Ok(Self::new())
            }
            Err(source) => Err(HotPatchError::MappingFile {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Add an entry
    #[must_use]
    pub fn with_entry(mut self, contract: LogicalName, implementation: LogicalName) -> Self {
        self.entries.insert(contract, implementation);
        self
    }

    /// Implementation mapped to a contract
    #[must_use]
    pub fn get(&self, contract: &LogicalName) -> Option<&LogicalName> {
        self.entries.get(contract)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> LogicalName {
        LogicalName::parse(s).unwrap()
    }

    #[test]
    fn test_parse_properties() {
        let map = ImplementationMap::parse(
            "# contracts\n\
             ! legacy comment\n\
             \n\
             demo.service.UserService = demo.service.impl.UserServiceImpl\n\
             demo.repo.UserRepo:demo.repo.jdbc.JdbcUserRepo\n\
             no separator here\n\
             bad..name = demo.X\n",
        );
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get(&name("demo.service.UserService")),
            Some(&name("demo.service.impl.UserServiceImpl"))
        );
        assert_eq!(
            map.get(&name("demo.repo.UserRepo")),
            Some(&name("demo.repo.jdbc.JdbcUserRepo"))
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = ImplementationMap::load(&dir.path().join("splice-class-map.properties")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splice-class-map.properties");
        std::fs::write(&path, "demo.A=demo.impl.AImpl\n").unwrap();
        let map = ImplementationMap::load(&path).unwrap();
        assert_eq!(map.get(&name("demo.A")), Some(&name("demo.impl.AImpl")));
    }
}
