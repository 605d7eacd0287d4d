//! CP-014: Error taxonomy.
//!
//! Provider failures are always fatal. NotFound / NotAStruct are fatal for
//! a root record and downgraded to warnings for nested references.
//! Unsupported conversions never surface as errors, they become Skip plans.

use std::fmt;
use std::path::PathBuf;

/// The type provider could not load a namespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("namespace {namespace:?} not found")]
    NamespaceNotFound { namespace: String },

    #[error("namespace {namespace:?} is unavailable: {reason}")]
    Unavailable { namespace: String, reason: String },
}

/// Record discovery failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("record {name:?} not found in namespace {namespace:?}")]
    NotFound { namespace: String, name: String },

    #[error("{name:?} in namespace {namespace:?} is not a record type")]
    NotAStruct { namespace: String, name: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DiscoveryError {
    /// NotFound and NotAStruct may be skipped when they concern a nested
    /// reference; provider failures never are.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NotAStruct { .. })
    }
}

/// Which side of a conversion an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Src,
    Dst,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Src => write!(f, "src"),
            Self::Dst => write!(f, "dst"),
        }
    }
}

/// Plan assembly failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("discover {side}: {source}")]
    Discovery {
        side: Side,
        #[source]
        source: DiscoveryError,
    },

    #[error("no matching records found between {src:?} and {dst:?}")]
    NoMatch { src: String, dst: String },
}

/// One problem found while validating a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Catalog loading failure.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("invalid type expression {expr:?}: {reason}")]
    TypeExpr { expr: String, reason: String },

    #[error("{} validation error(s)", .0.len())]
    Invalid(Vec<ValidationError>),
}
