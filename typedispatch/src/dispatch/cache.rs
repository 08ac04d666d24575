//! Resolution cache.
//!
//! Maps a concrete type to the registry key its resolution matched. The
//! cache holds plain ids and never keeps a type alive; entries whose type
//! was retired are swept once the cache grows past its threshold.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::hierarchy::{TypeId, TypeSystem};

/// Memoized resolutions, invalidated in bulk.
#[derive(Debug, Clone)]
pub struct ResolutionCache {
    entries: FxHashMap<TypeId, TypeId>,
    sweep_threshold: usize,
    next_sweep: usize,
}

impl ResolutionCache {
    /// Creates an empty cache that sweeps once it holds `sweep_threshold`
    /// entries.
    pub fn new(sweep_threshold: usize) -> Self {
        let sweep_threshold = sweep_threshold.max(1);
        Self {
            entries: FxHashMap::default(),
            sweep_threshold,
            next_sweep: sweep_threshold,
        }
    }

    /// The registry key cached for `ty`.
    pub fn get(&self, ty: TypeId) -> Option<TypeId> {
        self.entries.get(&ty).copied()
    }

    /// Records that `ty` resolves to the registry key `matched`.
    pub fn insert<S>(&mut self, types: &S, ty: TypeId, matched: TypeId)
    where
        S: TypeSystem + ?Sized,
    {
        if self.entries.len() >= self.next_sweep {
            self.sweep(types);
            self.next_sweep = (self.entries.len() * 2).max(self.sweep_threshold);
        }
        self.entries.insert(ty, matched);
    }

    /// Drops entries for types that are no longer live. Returns how many
    /// were removed.
    pub fn sweep<S>(&mut self, types: &S) -> usize
    where
        S: TypeSystem + ?Sized,
    {
        let before = self.entries.len();
        self.entries
            .retain(|&ty, &mut matched| types.is_live(ty) && types.is_live(matched));
        let removed = before - self.entries.len();
        if removed > 0 {
            trace!(removed, remaining = self.entries.len(), "swept resolution cache");
        }
        removed
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sweep = self.sweep_threshold;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
