use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Atomic reference-counted string type used for identifiers.
pub(crate) type ArcStr = Arc<str>;

/// Identity of a single configured resource.
///
/// An identifier pairs a `kind` (the capability or provider category the
/// resource belongs to, e.g. `"feature-store"`) with a `name` that is unique
/// within that kind. Two identifiers are equal iff both parts match. The
/// string form is `kind:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    kind: ArcStr,
    name: ArcStr,
}

impl ResourceIdentifier {
    pub fn new(kind: impl Into<ArcStr>, name: impl Into<ArcStr>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl FromStr for ResourceIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() => {
                Ok(Self::new(kind, name))
            }
            _ => Err(Error::InvalidIdentifier(s.to_string())),
        }
    }
}

/// Everything the graph needs to know about a resource.
///
/// Implementors are produced by whatever scans and prepares the workspace
/// configuration; the graph only reads the identifier and the declared
/// dependency list. Duplicate dependencies are allowed and collapse into a
/// single edge.
pub trait ResourceMetadata {
    fn identifier(&self) -> &ResourceIdentifier;
    fn dependencies(&self) -> &[ResourceIdentifier];
}

/// Plain metadata value, for callers that have nothing more to attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub identifier: ResourceIdentifier,
    #[serde(default)]
    pub dependencies: Vec<ResourceIdentifier>,
}

impl Metadata {
    pub fn new(identifier: ResourceIdentifier) -> Self {
        Self {
            identifier,
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, dependency: ResourceIdentifier) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

impl ResourceMetadata for Metadata {
    fn identifier(&self) -> &ResourceIdentifier {
        &self.identifier
    }

    fn dependencies(&self) -> &[ResourceIdentifier] {
        &self.dependencies
    }
}
