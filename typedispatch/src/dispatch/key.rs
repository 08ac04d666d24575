//! Registration keys.

use crate::error::{DispatchError, DispatchResult};
use crate::hierarchy::{TypeId, TypeSystem};

/// What a handler is registered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchKey {
    /// A single concrete type or category.
    Single(TypeId),
    /// A finite union of types; expands into one binding per member.
    Union(Vec<TypeId>),
}

impl DispatchKey {
    /// The types this key binds.
    pub fn members(&self) -> &[TypeId] {
        match self {
            DispatchKey::Single(ty) => std::slice::from_ref(ty),
            DispatchKey::Union(types) => types,
        }
    }

    /// Parses a type annotation such as `"int"` or `"int | str"`.
    ///
    /// Names are resolved through `types`; a single name yields
    /// [`DispatchKey::Single`].
    pub fn parse<S>(annotation: &str, types: &S) -> DispatchResult<Self>
    where
        S: TypeSystem + ?Sized,
    {
        let invalid = |reason: String| DispatchError::InvalidAnnotation {
            annotation: annotation.to_string(),
            reason,
        };

        let mut members = Vec::new();
        for part in annotation.split('|') {
            let name = part.trim();
            if name.is_empty() {
                return Err(invalid("expected a type name".to_string()));
            }
            let ty = types
                .lookup(name)
                .ok_or_else(|| invalid(format!("`{}` is not a known type", name)))?;
            if !members.contains(&ty) {
                members.push(ty);
            }
        }

        Ok(match members.as_slice() {
            [single] => DispatchKey::Single(*single),
            _ => DispatchKey::Union(members),
        })
    }

    /// Checks that the key names at least one type and only live ones.
    pub(crate) fn validate<S>(&self, types: &S) -> DispatchResult<()>
    where
        S: TypeSystem + ?Sized,
    {
        let members = self.members();
        if members.is_empty() {
            return Err(DispatchError::InvalidKey("empty type union".to_string()));
        }
        if let Some(unknown) = members.iter().find(|&&ty| !types.is_live(ty)) {
            return Err(DispatchError::InvalidKey(format!(
                "{} is not a known type",
                unknown
            )));
        }
        Ok(())
    }

    /// Renders the key as an annotation, e.g. `int | str`.
    pub fn describe<S>(&self, types: &S) -> String
    where
        S: TypeSystem + ?Sized,
    {
        self.members()
            .iter()
            .map(|&ty| types.name(ty))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl From<TypeId> for DispatchKey {
    fn from(ty: TypeId) -> Self {
        DispatchKey::Single(ty)
    }
}

impl From<Vec<TypeId>> for DispatchKey {
    fn from(types: Vec<TypeId>) -> Self {
        DispatchKey::Union(types)
    }
}

impl From<&[TypeId]> for DispatchKey {
    fn from(types: &[TypeId]) -> Self {
        DispatchKey::Union(types.to_vec())
    }
}

impl<const N: usize> From<[TypeId; N]> for DispatchKey {
    fn from(types: [TypeId; N]) -> Self {
        DispatchKey::Union(types.to_vec())
    }
}
