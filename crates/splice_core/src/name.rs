//! Logical names of replacement units.
//!
//! A logical name is a dotted path such as `demo.service.impl.UserServiceImpl`.
//! It is derived from a unit's location under the source root, so it must
//! always carry a namespace.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// File extension of a unit image
pub const UNIT_EXTENSION: &str = "unit";

/// Validated dotted name of a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalName(String);

impl LogicalName {
    /// Parse and validate a dotted name
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or has an invalid segment
    pub fn parse(name: &str) -> CoreResult<Self> {
        if name.is_empty() {
            return Err(invalid(name, "name is empty"));
        }
        for segment in name.split('.') {
            validate_segment(name, segment)?;
        }
        Ok(Self(name.to_string()))
    }

    /// Derive a name from a path relative to the source root
    ///
    /// `demo/mapper/UserMapper.unit` becomes `demo.mapper.UserMapper`.
    ///
    /// # Errors
    ///
    /// Returns error if the path has no namespace directory, is not UTF-8,
    /// or escapes the root
    pub fn from_relative_path(relative: &Path, extension: &str) -> CoreResult<Self> {
        let shown = relative.display().to_string();
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| invalid(&shown, "path is not valid UTF-8"))?;
                    segments.push(part.to_string());
                }
                Component::CurDir => {}
                _ => return Err(invalid(&shown, "path is not relative to the source root")),
            }
        }

        let file = segments
            .pop()
            .ok_or_else(|| invalid(&shown, "path is empty"))?;
        let suffix = format!(".{}", extension);
        let stem = file
            .strip_suffix(&suffix)
            .ok_or_else(|| invalid(&shown, "unexpected file extension"))?;

        if segments.is_empty() {
            return Err(invalid(&shown, "unit has no namespace directory"));
        }

        segments.push(stem.to_string());
        Self::parse(&segments.join("."))
    }

    /// Path of this name relative to the source root, with an extension
    #[must_use]
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        let mut path: PathBuf = self.0.split('.').collect();
        path.set_extension(extension);
        path
    }

    /// Get the full name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace part (everything before the last dot)
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(ns, _)| ns)
    }

    /// Simple name (last segment)
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, simple)| simple)
    }

    /// Default object name: the simple name with a lower-cased first letter
    #[must_use]
    pub fn object_name(&self) -> String {
        decapitalize(self.simple_name())
    }

    /// Qualified member key, e.g. `demo.UserMapper.getUser`
    #[must_use]
    pub fn member(&self, member: &str) -> String {
        format!("{}.{}", self.0, member)
    }

    /// Whether this name's namespace equals `prefix` or sits below it
    #[must_use]
    pub fn is_within(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('.');
        match self.namespace() {
            Some(ns) => {
                ns == prefix
                    || (ns.starts_with(prefix) && ns.as_bytes().get(prefix.len()) == Some(&b'.'))
            }
            None => false,
        }
    }
}

/// Lower-case the first character of `name`
#[must_use]
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn validate_segment(name: &str, segment: &str) -> CoreResult<()> {
    let mut chars = segment.chars();
    let first = chars
        .next()
        .ok_or_else(|| invalid(name, "empty segment"))?;
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return Err(invalid(name, "segment must start with a letter"));
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return Err(invalid(name, "segment contains an invalid character"));
    }
    Ok(())
}

fn invalid(name: &str, reason: &str) -> CoreError {
    CoreError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LogicalName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LogicalName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LogicalName> for String {
    fn from(name: LogicalName) -> Self {
        name.0
    }
}

impl AsRef<str> for LogicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
