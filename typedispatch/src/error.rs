//! Error types for hierarchy declaration and dispatch resolution.

use std::path::PathBuf;

use thiserror::Error;

use crate::hierarchy::TypeId;

/// Errors raised while declaring types or relations in a [`TypeHierarchy`].
///
/// [`TypeHierarchy`]: crate::hierarchy::TypeHierarchy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("unknown type {0}")]
    UnknownType(TypeId),

    #[error("a live type named `{0}` already exists")]
    DuplicateName(String),

    #[error("duplicate base `{base}` in declaration of `{name}`")]
    DuplicateBase { name: String, base: String },

    #[error("category `{name}` cannot derive from concrete type `{base}`")]
    ConcreteBaseOfCategory { name: String, base: String },

    #[error("cannot create a consistent method resolution order for `{name}` (bases {bases:?})")]
    InconsistentMro { name: String, bases: Vec<String> },

    #[error("`{0}` is not a category and cannot receive virtual implementers")]
    NotACategory(String),

    #[error("refusing to create an inheritance cycle: `{category}` already derives from `{ty}`")]
    InheritanceCycle { category: String, ty: String },

    #[error("`{name}` still has live subclasses: {subclasses:?}")]
    TypeInUse { name: String, subclasses: Vec<String> },

    #[error("the root type cannot be retired")]
    RootRetirement,

    #[error("no type ids left to define `{0}`")]
    TooManyTypes(String),
}

/// Hierarchy result type.
pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Errors raised by the linearization engine and the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The merge found no valid head. Fatal, never retried.
    #[error("inconsistent hierarchy while linearizing `{ty}`: no valid head among {pending:?}")]
    InconsistentHierarchy { ty: String, pending: Vec<String> },

    /// Two independently inferred categories matched with no precedence between them.
    #[error("ambiguous dispatch: {first_name} or {second_name}")]
    Ambiguous {
        first: TypeId,
        second: TypeId,
        first_name: String,
        second_name: String,
    },

    #[error("invalid dispatch key: {0}")]
    InvalidKey(String),

    #[error("invalid annotation `{annotation}`: {reason}")]
    InvalidAnnotation { annotation: String, reason: String },

    #[error("cannot dispatch on unknown type {0}")]
    UnknownType(TypeId),

    /// The registry lost its root binding. Indicates a bug, never a user error.
    #[error("no fallback handler is bound to the root type")]
    MissingFallback,
}

/// Dispatch result type.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors raised while loading a [`DispatchConfig`].
///
/// [`DispatchConfig`]: crate::config::DispatchConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
