//! Dispatch manifests.
//!
//! A manifest declares a hierarchy, its after-the-fact category links and a
//! table of labelled handlers:
//!
//! ```toml
//! prelude = true
//!
//! [[types]]
//! name = "Stack"
//! bases = ["list"]
//!
//! [[virtual]]
//! category = "Sized"
//! types = ["int"]
//!
//! [dispatch]
//! default = "fallback"
//!
//! [[dispatch.handlers]]
//! key = "Sized"
//! label = "sized"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use typedispatch::{
    Collections, DispatchConfig, DispatchError, DispatchTable, HierarchyError, TypeHierarchy, TypeId, TypeKind,
    TypeSystem,
};

/// Errors from loading or applying a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown type `{name}` in {context}")]
    UnknownType { name: String, context: String },

    #[error("invalid declaration for `{name}`: {source}")]
    Hierarchy {
        name: String,
        #[source]
        source: HierarchyError,
    },

    #[error("invalid handler key `{key}`: {source}")]
    Handler {
        key: String,
        #[source]
        source: DispatchError,
    },

    #[error("cannot linearize `{name}`: {source}")]
    Linearize {
        name: String,
        #[source]
        source: DispatchError,
    },
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Install the built-in collections hierarchy first.
    pub prelude: bool,

    /// Types to declare, in order. Bases must be declared earlier.
    pub types: Vec<TypeDecl>,

    /// After-the-fact category links.
    #[serde(rename = "virtual")]
    pub links: Vec<VirtualDecl>,

    pub dispatch: DispatchDecl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub bases: Vec<String>,
}

/// Links each of `types` to `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualDecl {
    pub category: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchDecl {
    /// Label of the fallback bound to the root type.
    pub default: String,
    pub handlers: Vec<HandlerDecl>,
}

impl Default for DispatchDecl {
    fn default() -> Self {
        Self {
            default: "default".to_string(),
            handlers: Vec::new(),
        }
    }
}

/// A handler binding: `key` is a type annotation such as `"int | str"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerDecl {
    pub key: String,
    pub label: String,
}

impl Manifest {
    pub fn from_toml_str(content: &str) -> ManifestResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ManifestResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Declares the hierarchy and fills a table of handler labels.
    pub fn build(&self, config: &DispatchConfig) -> ManifestResult<(Arc<TypeHierarchy>, DispatchTable<String>)> {
        let types = Arc::new(TypeHierarchy::new());

        if self.prelude {
            Collections::install(&types).map_err(|source| ManifestError::Hierarchy {
                name: "prelude".to_string(),
                source,
            })?;
        }

        for decl in &self.types {
            let context = format!("bases of `{}`", decl.name);
            let bases = decl
                .bases
                .iter()
                .map(|base| lookup(&types, base, &context))
                .collect::<ManifestResult<Vec<_>>>()?;
            types
                .define(&decl.name, decl.kind, &bases)
                .map_err(|source| ManifestError::Hierarchy {
                    name: decl.name.clone(),
                    source,
                })?;
        }

        for link in &self.links {
            let category = lookup(&types, &link.category, "virtual links")?;
            for name in &link.types {
                let ty = lookup(&types, name, &format!("implementers of `{}`", link.category))?;
                let added = types
                    .register_virtual(category, ty)
                    .map_err(|source| ManifestError::Hierarchy {
                        name: name.clone(),
                        source,
                    })?;
                if !added {
                    debug!(ty = %name, category = %link.category, "link already implied");
                }
            }
        }

        let mut table = DispatchTable::with_config(Arc::clone(&types), self.dispatch.default.clone(), config);
        for handler in &self.dispatch.handlers {
            table
                .register_annotated(&handler.key, handler.label.clone())
                .map_err(|source| ManifestError::Handler {
                    key: handler.key.clone(),
                    source,
                })?;
        }

        debug!(
            types = types.len(),
            handlers = table.registry().len(),
            "manifest applied"
        );
        Ok((types, table))
    }
}

/// Looks up a live type by name.
pub fn lookup(types: &TypeHierarchy, name: &str, context: &str) -> ManifestResult<TypeId> {
    types.lookup(name).ok_or_else(|| ManifestError::UnknownType {
        name: name.to_string(),
        context: context.to_string(),
    })
}
