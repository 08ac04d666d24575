//! Queries over a loaded manifest.

use std::sync::Arc;

use serde::Serialize;

use typedispatch::{linearize, DispatchConfig, DispatchError, DispatchTable, TypeHierarchy, TypeId, TypeSystem};

use crate::manifest::{lookup, Manifest, ManifestError, ManifestResult};

/// How a single type resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Resolved { label: String },
    Ambiguous { first: String, second: String },
    Failed { message: String },
}

impl Outcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub key: String,
    pub kind: &'static str,
    pub label: String,
}

/// Result of resolving every live type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub problems: Vec<Resolution>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// A hierarchy and handler table built from a manifest.
pub struct Inspector {
    types: Arc<TypeHierarchy>,
    table: DispatchTable<String>,
}

impl Inspector {
    pub fn from_manifest(manifest: &Manifest, config: &DispatchConfig) -> ManifestResult<Self> {
        let (types, table) = manifest.build(config)?;
        Ok(Self { types, table })
    }

    pub fn types(&self) -> &TypeHierarchy {
        &self.types
    }

    /// Linearization of `name` against the bound keys.
    pub fn mro(&self, name: &str) -> ManifestResult<Vec<String>> {
        let ty = lookup(&self.types, name, "the query")?;
        let order = linearize(&*self.types, ty, self.table.registry().keys()).map_err(|source| {
            ManifestError::Linearize {
                name: name.to_string(),
                source,
            }
        })?;
        Ok(self.names(&order))
    }

    pub fn resolve(&mut self, name: &str) -> ManifestResult<Resolution> {
        let ty = lookup(&self.types, name, "the query")?;
        Ok(self.resolve_id(ty))
    }

    /// Resolves every live type, in definition order.
    pub fn resolve_all(&mut self) -> Vec<Resolution> {
        self.types
            .live_types()
            .into_iter()
            .map(|ty| self.resolve_id(ty))
            .collect()
    }

    /// Bindings in registration order.
    pub fn bindings(&self) -> Vec<Binding> {
        self.table
            .registry()
            .iter()
            .map(|(ty, label)| Binding {
                key: self.types.name(ty),
                kind: self.types.kind(ty).map_or("retired", |kind| kind.as_str()),
                label: label.clone(),
            })
            .collect()
    }

    pub fn check(&mut self) -> CheckReport {
        let resolutions = self.resolve_all();
        CheckReport {
            checked: resolutions.len(),
            problems: resolutions.into_iter().filter(|r| !r.outcome.is_resolved()).collect(),
        }
    }

    fn resolve_id(&mut self, ty: TypeId) -> Resolution {
        let name = self.types.name(ty);
        let outcome = match self.table.resolve(ty) {
            Ok(label) => Outcome::Resolved { label: label.clone() },
            Err(DispatchError::Ambiguous {
                first_name,
                second_name,
                ..
            }) => Outcome::Ambiguous {
                first: first_name,
                second: second_name,
            },
            Err(err) => Outcome::Failed {
                message: err.to_string(),
            },
        };
        Resolution { ty: name, outcome }
    }

    fn names(&self, order: &[TypeId]) -> Vec<String> {
        order.iter().map(|&ty| self.types.name(ty)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inspector(manifest: &str) -> Inspector {
        let manifest = Manifest::from_toml_str(manifest).unwrap();
        Inspector::from_manifest(&manifest, &DispatchConfig::default()).unwrap()
    }

    const AMBIGUOUS: &str = r#"
        [[types]]
        name = "Iterable"
        kind = "category"

        [[types]]
        name = "Container"
        kind = "category"

        [[types]]
        name = "P"

        [[virtual]]
        category = "Iterable"
        types = ["P"]

        [[virtual]]
        category = "Container"
        types = ["P"]

        [[dispatch.handlers]]
        key = "Iterable"
        label = "iterable"

        [[dispatch.handlers]]
        key = "Container"
        label = "container"
    "#;

    #[test]
    fn test_mro_includes_bound_categories() {
        let inspector = inspector(
            "prelude = true\n[[dispatch.handlers]]\nkey = \"MutableMapping\"\nlabel = \"mm\"\n",
        );
        let order = inspector.mro("dict").unwrap();
        assert_eq!(
            order,
            vec!["dict", "MutableMapping", "Mapping", "Sized", "Iterable", "Container", "object"]
        );
        assert!(matches!(
            inspector.mro("float"),
            Err(ManifestError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_resolve_and_bindings() {
        let mut inspector = inspector(
            "prelude = true\n[dispatch]\ndefault = \"base\"\n[[dispatch.handlers]]\nkey = \"Sized\"\nlabel = \"sized\"\n",
        );
        assert_eq!(
            inspector.resolve("list").unwrap().outcome,
            Outcome::Resolved {
                label: "sized".to_string()
            }
        );
        assert_eq!(
            inspector.resolve("int").unwrap().outcome,
            Outcome::Resolved {
                label: "base".to_string()
            }
        );
        assert_eq!(
            inspector.bindings(),
            vec![
                Binding {
                    key: "object".to_string(),
                    kind: "concrete",
                    label: "base".to_string()
                },
                Binding {
                    key: "Sized".to_string(),
                    kind: "category",
                    label: "sized".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_check_reports_ambiguity() {
        let mut inspector = inspector(AMBIGUOUS);
        let report = inspector.check();
        assert_eq!(report.checked, 4);
        assert!(!report.is_clean());
        assert_eq!(
            report.problems,
            vec![Resolution {
                ty: "P".to_string(),
                outcome: Outcome::Ambiguous {
                    first: "Iterable".to_string(),
                    second: "Container".to_string()
                },
            }]
        );
    }

    #[test]
    fn test_resolution_serializes_flat() {
        let mut inspector = inspector(AMBIGUOUS);
        let resolution = inspector.resolve("P").unwrap();
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "P",
                "status": "ambiguous",
                "first": "Iterable",
                "second": "Container",
            })
        );
    }
}
