//! Built-in collections hierarchy.
//!
//! A small abstract-collections family used by the inspector prelude and by
//! tests. Concrete containers are linked to their categories after the fact,
//! the way a host would register existing types with new abstractions.

use crate::error::HierarchyResult;
use crate::hierarchy::{TypeHierarchy, TypeId};

/// Ids of the built-in collection types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collections {
    pub sized: TypeId,
    pub iterable: TypeId,
    pub container: TypeId,
    pub sequence: TypeId,
    pub mutable_sequence: TypeId,
    pub set: TypeId,
    pub mutable_set: TypeId,
    pub mapping: TypeId,
    pub mutable_mapping: TypeId,

    pub int: TypeId,
    pub bool: TypeId,
    pub str: TypeId,
    pub list: TypeId,
    pub tuple: TypeId,
    pub dict: TypeId,
    pub set_type: TypeId,
    pub frozenset: TypeId,
    pub ordered_dict: TypeId,
    pub defaultdict: TypeId,
    pub chain_map: TypeId,
    pub user_dict: TypeId,
}

impl Collections {
    /// Declares the collections hierarchy in `types`.
    ///
    /// Fails if any of the names is already taken.
    pub fn install(types: &TypeHierarchy) -> HierarchyResult<Self> {
        // === Categories ===
        let sized = types.category("Sized", &[])?;
        let iterable = types.category("Iterable", &[])?;
        let container = types.category("Container", &[])?;
        let sequence = types.category("Sequence", &[sized, iterable, container])?;
        let mutable_sequence = types.category("MutableSequence", &[sequence])?;
        let set = types.category("Set", &[sized, iterable, container])?;
        let mutable_set = types.category("MutableSet", &[set])?;
        let mapping = types.category("Mapping", &[sized, iterable, container])?;
        let mutable_mapping = types.category("MutableMapping", &[mapping])?;

        // === Concrete types ===
        let int = types.concrete("int", &[])?;
        let bool = types.concrete("bool", &[int])?;
        let str = types.concrete("str", &[])?;
        let list = types.concrete("list", &[])?;
        let tuple = types.concrete("tuple", &[])?;
        let dict = types.concrete("dict", &[])?;
        let set_type = types.concrete("set", &[])?;
        let frozenset = types.concrete("frozenset", &[])?;
        let ordered_dict = types.concrete("OrderedDict", &[dict])?;
        let defaultdict = types.concrete("defaultdict", &[dict])?;
        let chain_map = types.concrete("ChainMap", &[mutable_mapping])?;
        let user_dict = types.concrete("UserDict", &[mutable_mapping])?;

        // === After-the-fact relations ===
        types.register_virtual(sequence, str)?;
        types.register_virtual(sequence, tuple)?;
        types.register_virtual(mutable_sequence, list)?;
        types.register_virtual(mutable_mapping, dict)?;
        types.register_virtual(mutable_set, set_type)?;
        types.register_virtual(set, frozenset)?;

        Ok(Self {
            sized,
            iterable,
            container,
            sequence,
            mutable_sequence,
            set,
            mutable_set,
            mapping,
            mutable_mapping,
            int,
            bool,
            str,
            list,
            tuple,
            dict,
            set_type,
            frozenset,
            ordered_dict,
            defaultdict,
            chain_map,
            user_dict,
        })
    }

    /// Every built-in type, categories first.
    pub fn all(&self) -> [TypeId; 21] {
        [
            self.sized,
            self.iterable,
            self.container,
            self.sequence,
            self.mutable_sequence,
            self.set,
            self.mutable_set,
            self.mapping,
            self.mutable_mapping,
            self.int,
            self.bool,
            self.str,
            self.list,
            self.tuple,
            self.dict,
            self.set_type,
            self.frozenset,
            self.ordered_dict,
            self.defaultdict,
            self.chain_map,
            self.user_dict,
        ]
    }
}
