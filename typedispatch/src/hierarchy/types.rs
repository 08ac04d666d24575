//! Core identifiers for type nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a type node within a hierarchy.
///
/// Ids are handed out sequentially and never reused, so an id that outlives
/// its type (see [`TypeHierarchy::retire`]) simply stops being live.
///
/// [`TypeHierarchy::retire`]: super::TypeHierarchy::retire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// The universal root type every hierarchy starts with.
    pub const ROOT: TypeId = TypeId(0);

    /// Id for arena slot `index`, or `None` once the id space is exhausted.
    pub(crate) fn new(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }

    /// Index of this type in its hierarchy's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a type node stands for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// An ordinary type with declared parents only.
    #[default]
    Concrete,
    /// An abstract behavioural grouping that other types may be linked to
    /// after the fact.
    Category,
}

impl TypeKind {
    /// Returns the keyword used for this kind in manifests and listings.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Concrete => "concrete",
            TypeKind::Category => "category",
        }
    }
}
