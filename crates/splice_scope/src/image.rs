//! Unit image format.
//!
//! A unit image is the raw, unresolved form of one replacement unit as it
//! sits on disk. References to other units are plain logical names here; the
//! scope that defines the image resolves them to loaded definitions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use splice_core::LogicalName;
use std::fmt;

/// Largest accepted unit image
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Image decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// Image is empty
    #[error("unit image is empty")]
    Empty,

    /// Size limit exceeded
    #[error("unit image size {size} exceeds limit {limit}")]
    TooLarge {
        /// Actual size
        size: usize,
        /// Allowed size
        limit: usize,
    },

    /// Not a well-formed image
    #[error("malformed unit image: {0}")]
    Malformed(String),
}

/// Structural shape of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeShape {
    /// Concrete, instantiable type
    #[default]
    Class,
    /// Abstract type
    Abstract,
    /// Contract with no state
    Interface,
    /// Enumeration
    Enum,
    /// Annotation type
    Annotation,
}

impl TypeShape {
    /// Whether the container can create an instance of this shape
    #[must_use]
    pub const fn is_instantiable(&self) -> bool {
        matches!(self, Self::Class)
    }
}

/// Role markers attached to a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stereotype {
    /// Generic managed component
    Component,
    /// Service-layer component
    Service,
    /// Persistence-mapping contract
    Repository,
    /// Externally routable handler
    Handler {
        /// Path prefix shared by every route of the handler
        #[serde(default)]
        base_path: String,
    },
}

/// HTTP-style verb of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        };
        f.write_str(verb)
    }
}

impl std::str::FromStr for HttpVerb {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            other => Err(ImageError::Malformed(format!("unknown verb '{}'", other))),
        }
    }
}

/// Route marker on a handler method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Verb
    pub verb: HttpVerb,
    /// Path relative to the handler's base path
    #[serde(default)]
    pub path: String,
}

/// Kind of mapped statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Query
    Select,
    /// Insert
    Insert,
    /// Update
    Update,
    /// Delete
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(kind)
    }
}

/// Generated-key rule attached to a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectKeySpec {
    /// Query producing the key
    pub sql: String,
    /// Property receiving the key
    pub key_property: String,
    /// Run before the owning statement
    #[serde(default)]
    pub before: bool,
}

/// Statement marker on a mapper method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSpec {
    /// Statement kind
    pub kind: StatementKind,
    /// Statement text
    pub sql: String,
    /// Result shape id, relative to the mapper unless qualified
    #[serde(default)]
    pub result_map: Option<String>,
    /// Generated-key rule
    #[serde(default)]
    pub select_key: Option<SelectKeySpec>,
}

/// Executable body of a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodBody {
    /// Return a fixed value
    Literal(String),
    /// Forward the call to a dependency field
    Delegate {
        /// Field holding the dependency
        field: String,
        /// Method invoked on the dependency
        method: String,
    },
}

/// Field entry of an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldImage {
    /// Field name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: LogicalName,
    /// Whether the container injects this field
    #[serde(default)]
    pub inject: bool,
}

/// Method entry of an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodImage {
    /// Method name
    pub name: String,
    /// Route marker
    #[serde(default)]
    pub route: Option<RouteSpec>,
    /// Statement marker
    #[serde(default)]
    pub statement: Option<StatementSpec>,
    /// Body
    #[serde(default)]
    pub body: Option<MethodBody>,
}

/// Raw image of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitImage {
    /// Logical name the image claims
    pub name: LogicalName,
    /// Shape
    #[serde(default)]
    pub shape: TypeShape,
    /// Role markers
    #[serde(default)]
    pub stereotypes: Vec<Stereotype>,
    /// Supertypes
    #[serde(default)]
    pub extends: Vec<LogicalName>,
    /// Fields
    #[serde(default)]
    pub fields: Vec<FieldImage>,
    /// Directly declared methods
    #[serde(default)]
    pub methods: Vec<MethodImage>,
}

impl UnitImage {
    /// Create an empty class image
    #[must_use]
    pub fn new(name: LogicalName) -> Self {
        Self {
            name,
            shape: TypeShape::Class,
            stereotypes: Vec::new(),
            extends: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Decode and validate raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are empty, too large, not a valid image, or
    /// declare the same field or method twice
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(ImageError::TooLarge {
                size: bytes.len(),
                limit: MAX_IMAGE_SIZE,
            });
        }

        let image: Self =
            serde_json::from_slice(bytes).map_err(|e| ImageError::Malformed(e.to_string()))?;
        image.check_members()?;
        Ok(image)
    }

    /// Encode to bytes
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn encode(&self) -> Result<Vec<u8>, ImageError> {
        serde_json::to_vec_pretty(self).map_err(|e| ImageError::Malformed(e.to_string()))
    }

    /// Every unit name this image refers to, supertypes first
    #[must_use]
    pub fn references(&self) -> IndexSet<&LogicalName> {
        self.extends
            .iter()
            .chain(self.fields.iter().map(|f| &f.ty))
            .filter(|r| **r != self.name)
            .collect()
    }

    /// Set the shape
    #[must_use]
    pub fn with_shape(mut self, shape: TypeShape) -> Self {
        self.shape = shape;
        self
    }

    /// Add a stereotype
    #[must_use]
    pub fn with_stereotype(mut self, stereotype: Stereotype) -> Self {
        self.stereotypes.push(stereotype);
        self
    }

    /// Add a supertype
    #[must_use]
    pub fn extending(mut self, parent: LogicalName) -> Self {
        self.extends.push(parent);
        self
    }

    /// Add an injectable field
    #[must_use]
    pub fn with_injected(mut self, name: &str, ty: LogicalName) -> Self {
        self.fields.push(FieldImage {
            name: name.to_string(),
            ty,
            inject: true,
        });
        self
    }

    /// Add a method
    #[must_use]
    pub fn with_method(mut self, method: MethodImage) -> Self {
        self.methods.push(method);
        self
    }

    fn check_members(&self) -> Result<(), ImageError> {
        let mut seen = IndexSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ImageError::Malformed(format!(
                    "{} declares field '{}' twice",
                    self.name, field.name
                )));
            }
        }
        seen.clear();
        for method in &self.methods {
            if !seen.insert(method.name.as_str()) {
                return Err(ImageError::Malformed(format!(
                    "{} declares method '{}' twice",
                    self.name, method.name
                )));
            }
        }
        Ok(())
    }
}

impl MethodImage {
    /// Method with no markers and no body
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            route: None,
            statement: None,
            body: None,
        }
    }

    /// Attach a literal body
    #[must_use]
    pub fn returning(mut self, value: &str) -> Self {
        self.body = Some(MethodBody::Literal(value.to_string()));
        self
    }

    /// Attach a delegating body
    #[must_use]
    pub fn delegating(mut self, field: &str, method: &str) -> Self {
        self.body = Some(MethodBody::Delegate {
            field: field.to_string(),
            method: method.to_string(),
        });
        self
    }

    /// Attach a route marker
    #[must_use]
    pub fn routed(mut self, verb: HttpVerb, path: &str) -> Self {
        self.route = Some(RouteSpec {
            verb,
            path: path.to_string(),
        });
        self
    }

    /// Attach a statement marker
    #[must_use]
    pub fn mapped(mut self, kind: StatementKind, sql: &str) -> Self {
        self.statement = Some(StatementSpec {
            kind,
            sql: sql.to_string(),
            result_map: None,
            select_key: None,
        });
        self
    }
}

/// Content digest of raw unit bytes
#[must_use]
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
