//! Arena-backed type hierarchy with an explicit category relation table.

use indexmap::IndexSet;
use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::debug;

use crate::error::{HierarchyError, HierarchyResult};
use crate::linearize::c3_merge;

use super::system::{advance_generation, TypeSystem};
use super::types::{TypeId, TypeKind};

type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// Everything known about one live type.
#[derive(Debug, Clone)]
struct TypeRecord {
    name: String,
    kind: TypeKind,
    /// Declared parents, in declaration order.
    bases: Vec<TypeId>,
    /// Declared-only linearization, self first.
    mro: Vec<TypeId>,
    is_abstract: bool,
    /// Types that declared this one as a parent.
    subclasses: FxIndexSet<TypeId>,
    /// Categories this type was linked to after the fact.
    categories: FxIndexSet<TypeId>,
    /// Types linked to this category after the fact.
    implementers: FxIndexSet<TypeId>,
}

#[derive(Debug)]
struct HierarchyState {
    /// Retired slots stay `None`; ids are never handed out twice.
    records: Vec<Option<TypeRecord>>,
    names: FxHashMap<String, TypeId>,
}

impl HierarchyState {
    fn get(&self, ty: TypeId) -> Option<&TypeRecord> {
        self.records.get(ty.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, ty: TypeId) -> Option<&mut TypeRecord> {
        self.records.get_mut(ty.index()).and_then(Option::as_mut)
    }

    fn record(&self, ty: TypeId) -> HierarchyResult<&TypeRecord> {
        self.get(ty).ok_or(HierarchyError::UnknownType(ty))
    }

    fn name(&self, ty: TypeId) -> String {
        match self.get(ty) {
            Some(record) => record.name.clone(),
            None => format!("<retired {}>", ty),
        }
    }

    fn names_of(&self, types: &[TypeId]) -> Vec<String> {
        types.iter().map(|&ty| self.name(ty)).collect()
    }

    /// Declared or virtual satisfaction.
    ///
    /// Virtual links only point at category-bearing types, so a target that
    /// is not category-bearing can only be reached through declared parents.
    fn satisfies(&self, ty: TypeId, of: TypeId) -> bool {
        let (Some(record), Some(target)) = (self.get(ty), self.get(of)) else {
            return false;
        };
        if record.mro.contains(&of) {
            return true;
        }
        if !target.is_abstract {
            return false;
        }
        record
            .mro
            .iter()
            .filter_map(|&ancestor| self.get(ancestor))
            .any(|ancestor| {
                ancestor
                    .categories
                    .iter()
                    .any(|&category| self.satisfies(category, of))
            })
    }
}

/// A mutable type hierarchy shared between dispatch tables.
///
/// All methods take `&self`; the state sits behind a read-write lock so a
/// hierarchy can be wrapped in an `Arc` and extended while tables that use
/// it are alive.
#[derive(Debug)]
pub struct TypeHierarchy {
    state: RwLock<HierarchyState>,
}

impl TypeHierarchy {
    /// Name of the universal root type.
    pub const ROOT_NAME: &'static str = "object";

    /// Creates a hierarchy holding only the root type.
    pub fn new() -> Self {
        let root = TypeRecord {
            name: Self::ROOT_NAME.to_string(),
            kind: TypeKind::Concrete,
            bases: Vec::new(),
            mro: vec![TypeId::ROOT],
            is_abstract: false,
            subclasses: FxIndexSet::default(),
            categories: FxIndexSet::default(),
            implementers: FxIndexSet::default(),
        };
        let mut names = FxHashMap::default();
        names.insert(Self::ROOT_NAME.to_string(), TypeId::ROOT);
        Self {
            state: RwLock::new(HierarchyState {
                records: vec![Some(root)],
                names,
            }),
        }
    }

    /// Declares a new type.
    ///
    /// An empty `bases` list makes the root the only parent. Categories may
    /// only derive from other categories or the root.
    pub fn define(&self, name: &str, kind: TypeKind, bases: &[TypeId]) -> HierarchyResult<TypeId> {
        let mut state = self.state.write();

        if state.names.contains_key(name) {
            return Err(HierarchyError::DuplicateName(name.to_string()));
        }
        for (i, &base) in bases.iter().enumerate() {
            let record = state.record(base)?;
            if bases[..i].contains(&base) {
                return Err(HierarchyError::DuplicateBase {
                    name: name.to_string(),
                    base: record.name.clone(),
                });
            }
            if kind == TypeKind::Category && base != TypeId::ROOT && record.kind != TypeKind::Category {
                return Err(HierarchyError::ConcreteBaseOfCategory {
                    name: name.to_string(),
                    base: record.name.clone(),
                });
            }
        }

        let bases = if bases.is_empty() {
            vec![TypeId::ROOT]
        } else {
            bases.to_vec()
        };
        let id = TypeId::new(state.records.len())
            .ok_or_else(|| HierarchyError::TooManyTypes(name.to_string()))?;

        let mut sequences = vec![vec![id]];
        sequences.extend(bases.iter().filter_map(|&b| state.get(b)).map(|r| r.mro.clone()));
        sequences.push(bases.clone());
        let mro = c3_merge(sequences).map_err(|_| HierarchyError::InconsistentMro {
            name: name.to_string(),
            bases: state.names_of(&bases),
        })?;

        let is_abstract = kind == TypeKind::Category
            || bases.iter().any(|&b| state.get(b).is_some_and(|r| r.is_abstract));

        for &base in &bases {
            if let Some(parent) = state.get_mut(base) {
                parent.subclasses.insert(id);
            }
        }
        state.records.push(Some(TypeRecord {
            name: name.to_string(),
            kind,
            bases,
            mro,
            is_abstract,
            subclasses: FxIndexSet::default(),
            categories: FxIndexSet::default(),
            implementers: FxIndexSet::default(),
        }));
        state.names.insert(name.to_string(), id);

        debug!(%id, name, kind = kind.as_str(), "defined type");
        Ok(id)
    }

    /// Declares a concrete type.
    pub fn concrete(&self, name: &str, bases: &[TypeId]) -> HierarchyResult<TypeId> {
        self.define(name, TypeKind::Concrete, bases)
    }

    /// Declares a category.
    pub fn category(&self, name: &str, bases: &[TypeId]) -> HierarchyResult<TypeId> {
        self.define(name, TypeKind::Category, bases)
    }

    /// Links `ty` to `category` without making `category` a declared parent.
    ///
    /// Returns `Ok(false)` when `ty` already satisfies `category`; nothing is
    /// recorded and the generation does not move in that case.
    pub fn register_virtual(&self, category: TypeId, ty: TypeId) -> HierarchyResult<bool> {
        let mut state = self.state.write();

        let target = state.record(category)?;
        if !target.is_abstract {
            return Err(HierarchyError::NotACategory(target.name.clone()));
        }
        state.record(ty)?;

        if state.satisfies(ty, category) {
            return Ok(false);
        }
        if state.satisfies(category, ty) {
            return Err(HierarchyError::InheritanceCycle {
                category: state.name(category),
                ty: state.name(ty),
            });
        }

        if let Some(record) = state.get_mut(ty) {
            record.categories.insert(category);
        }
        if let Some(record) = state.get_mut(category) {
            record.implementers.insert(ty);
        }
        let generation = advance_generation();
        debug!(
            category = %state.name(category),
            ty = %state.name(ty),
            generation,
            "registered virtual subtype"
        );
        Ok(true)
    }

    /// Removes a type that is no longer needed.
    ///
    /// Category links to and from the type are dropped. The id stays dead
    /// forever, which is what lets resolution caches sweep it lazily.
    pub fn retire(&self, ty: TypeId) -> HierarchyResult<()> {
        if ty == TypeId::ROOT {
            return Err(HierarchyError::RootRetirement);
        }
        let mut state = self.state.write();

        let record = state.record(ty)?;
        if !record.subclasses.is_empty() {
            let subclasses: Vec<TypeId> = record.subclasses.iter().copied().collect();
            return Err(HierarchyError::TypeInUse {
                name: record.name.clone(),
                subclasses: state.names_of(&subclasses),
            });
        }

        let Some(record) = state.records[ty.index()].take() else {
            return Err(HierarchyError::UnknownType(ty));
        };
        state.names.remove(&record.name);
        for &base in &record.bases {
            if let Some(parent) = state.get_mut(base) {
                parent.subclasses.shift_remove(&ty);
            }
        }
        for &category in &record.categories {
            if let Some(target) = state.get_mut(category) {
                target.implementers.shift_remove(&ty);
            }
        }
        for &implementer in &record.implementers {
            if let Some(source) = state.get_mut(implementer) {
                source.categories.shift_remove(&ty);
            }
        }

        if record.categories.is_empty() && record.implementers.is_empty() {
            debug!(%ty, name = %record.name, "retired type");
        } else {
            let generation = advance_generation();
            debug!(%ty, name = %record.name, generation, "retired type with category links");
        }
        Ok(())
    }

    /// Kind of a live type.
    pub fn kind(&self, ty: TypeId) -> Option<TypeKind> {
        self.state.read().get(ty).map(|r| r.kind)
    }

    /// Types linked to `category` after the fact, in registration order.
    pub fn implementers(&self, category: TypeId) -> Vec<TypeId> {
        self.state
            .read()
            .get(category)
            .map(|r| r.implementers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Categories `ty` was linked to after the fact, in registration order.
    pub fn virtual_categories(&self, ty: TypeId) -> Vec<TypeId> {
        self.state
            .read()
            .get(ty)
            .map(|r| r.categories.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All live types, in definition order.
    pub fn live_types(&self) -> Vec<TypeId> {
        self.state
            .read()
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_some())
            .filter_map(|(index, _)| TypeId::new(index))
            .collect()
    }

    /// Number of live types, the root included.
    pub fn len(&self) -> usize {
        self.state.read().records.iter().flatten().count()
    }

    /// Always false: the root cannot be retired.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSystem for TypeHierarchy {
    fn root(&self) -> TypeId {
        TypeId::ROOT
    }

    fn is_live(&self, ty: TypeId) -> bool {
        self.state.read().get(ty).is_some()
    }

    fn name(&self, ty: TypeId) -> String {
        self.state.read().name(ty)
    }

    fn lookup(&self, name: &str) -> Option<TypeId> {
        self.state.read().names.get(name).copied()
    }

    fn bases(&self, ty: TypeId) -> Vec<TypeId> {
        self.state.read().get(ty).map(|r| r.bases.clone()).unwrap_or_default()
    }

    fn mro(&self, ty: TypeId) -> Vec<TypeId> {
        self.state.read().get(ty).map(|r| r.mro.clone()).unwrap_or_default()
    }

    fn is_subtype(&self, ty: TypeId, of: TypeId) -> bool {
        self.state.read().satisfies(ty, of)
    }

    fn is_abstract(&self, ty: TypeId) -> bool {
        self.state.read().get(ty).is_some_and(|r| r.is_abstract)
    }

    fn subclasses(&self, ty: TypeId) -> Vec<TypeId> {
        self.state
            .read()
            .get(ty)
            .map(|r| r.subclasses.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_hierarchy_has_root() {
        let types = TypeHierarchy::new();
        assert_eq!(types.len(), 1);
        assert_eq!(types.lookup("object"), Some(TypeId::ROOT));
        assert_eq!(types.mro(TypeId::ROOT), vec![TypeId::ROOT]);
        assert!(!types.is_abstract(TypeId::ROOT));
    }

    #[test]
    fn test_define_defaults_to_root_base() {
        let types = TypeHierarchy::new();
        let a = types.concrete("A", &[]).unwrap();
        assert_eq!(types.bases(a), vec![TypeId::ROOT]);
        assert_eq!(types.mro(a), vec![a, TypeId::ROOT]);
        assert_eq!(types.subclasses(TypeId::ROOT), vec![a]);
    }

    #[test]
    fn test_declared_mro_is_c3() {
        let types = TypeHierarchy::new();
        let a = types.concrete("A", &[]).unwrap();
        let b = types.concrete("B", &[a]).unwrap();
        let c = types.concrete("C", &[a]).unwrap();
        let d = types.concrete("D", &[b, c]).unwrap();
        assert_eq!(types.mro(d), vec![d, b, c, a, TypeId::ROOT]);
    }

    #[test]
    fn test_inconsistent_mro_rejected() {
        let types = TypeHierarchy::new();
        let a = types.concrete("A", &[]).unwrap();
        let b = types.concrete("B", &[a]).unwrap();
        let err = types.concrete("C", &[a, b]).unwrap_err();
        assert!(matches!(err, HierarchyError::InconsistentMro { .. }));
        assert_eq!(types.lookup("C"), None);
        assert_eq!(types.subclasses(a), vec![b]);
    }

    #[test]
    fn test_duplicate_name_and_base() {
        let types = TypeHierarchy::new();
        let a = types.concrete("A", &[]).unwrap();
        assert_eq!(
            types.concrete("A", &[]).unwrap_err(),
            HierarchyError::DuplicateName("A".to_string())
        );
        assert!(matches!(
            types.concrete("B", &[a, a]).unwrap_err(),
            HierarchyError::DuplicateBase { .. }
        ));
    }

    #[test]
    fn test_category_cannot_derive_from_concrete() {
        let types = TypeHierarchy::new();
        let a = types.concrete("A", &[]).unwrap();
        assert!(matches!(
            types.category("Cat", &[a]).unwrap_err(),
            HierarchyError::ConcreteBaseOfCategory { .. }
        ));
    }

    #[test]
    fn test_abstractness_is_inherited() {
        let types = TypeHierarchy::new();
        let sized = types.category("Sized", &[]).unwrap();
        let plain = types.concrete("Plain", &[]).unwrap();
        let o = types.concrete("O", &[sized]).unwrap();
        assert!(types.is_abstract(sized));
        assert!(types.is_abstract(o));
        assert!(!types.is_abstract(plain));
    }

    #[test]
    fn test_virtual_subtype_is_transitive() {
        let types = TypeHierarchy::new();
        let sized = types.category("Sized", &[]).unwrap();
        let seq = types.category("Sequence", &[sized]).unwrap();
        let list = types.concrete("list", &[]).unwrap();
        let my_list = types.concrete("MyList", &[list]).unwrap();

        assert!(!types.is_subtype(my_list, sized));
        assert!(types.register_virtual(seq, list).unwrap());
        assert!(types.is_subtype(list, seq));
        assert!(types.is_subtype(list, sized));
        assert!(types.is_subtype(my_list, sized));
        assert!(!types.mro(list).contains(&seq));
        assert_eq!(types.implementers(seq), vec![list]);
        assert_eq!(types.virtual_categories(list), vec![seq]);
    }

    #[test]
    fn test_virtual_does_not_reach_concrete_targets() {
        let types = TypeHierarchy::new();
        let mapping = types.category("Mapping", &[]).unwrap();
        let dict = types.concrete("dict", &[]).unwrap();
        let x = types.concrete("X", &[]).unwrap();
        types.register_virtual(mapping, dict).unwrap();
        types.register_virtual(mapping, x).unwrap();
        assert!(!types.is_subtype(x, dict));
    }

    #[test]
    fn test_register_virtual_noop_and_generation() {
        let types = TypeHierarchy::new();
        let sized = types.category("Sized", &[]).unwrap();
        let o = types.concrete("O", &[sized]).unwrap();
        let before = types.generation();
        assert!(!types.register_virtual(sized, o).unwrap());
        assert!(types.implementers(sized).is_empty());

        let p = types.concrete("P", &[]).unwrap();
        assert!(types.register_virtual(sized, p).unwrap());
        assert!(types.generation() > before);
    }

    #[test]
    fn test_register_virtual_rejects_cycles_and_concrete_targets() {
        let types = TypeHierarchy::new();
        let sized = types.category("Sized", &[]).unwrap();
        let plain = types.concrete("Plain", &[]).unwrap();
        assert!(matches!(
            types.register_virtual(sized, TypeId::ROOT).unwrap_err(),
            HierarchyError::InheritanceCycle { .. }
        ));
        assert_eq!(
            types.register_virtual(plain, sized).unwrap_err(),
            HierarchyError::NotACategory("Plain".to_string())
        );
    }

    #[test]
    fn test_retire_drops_links() {
        let types = TypeHierarchy::new();
        let sized = types.category("Sized", &[]).unwrap();
        let temp = types.concrete("Temp", &[]).unwrap();
        types.register_virtual(sized, temp).unwrap();

        let before = types.generation();
        types.retire(temp).unwrap();
        assert!(types.generation() > before);
        assert!(!types.is_live(temp));
        assert!(types.implementers(sized).is_empty());
        assert_eq!(types.lookup("Temp"), None);
        assert_eq!(types.name(temp), format!("<retired {}>", temp));

        // The name is free again but the id is not reused.
        let again = types.concrete("Temp", &[]).unwrap();
        assert_ne!(again, temp);
    }

    #[test]
    fn test_retire_refuses_root_and_parents() {
        let types = TypeHierarchy::new();
        let a = types.concrete("A", &[]).unwrap();
        types.concrete("B", &[a]).unwrap();
        assert_eq!(types.retire(TypeId::ROOT).unwrap_err(), HierarchyError::RootRetirement);
        assert!(matches!(types.retire(a).unwrap_err(), HierarchyError::TypeInUse { .. }));
    }
}
