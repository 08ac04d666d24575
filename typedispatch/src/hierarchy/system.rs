//! The capabilities the dispatch core consumes from a host type system.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::TypeId;

/// Process-wide hierarchy generation.
static GENERATION: AtomicU64 = AtomicU64::new(0);

/// Returns the current process-wide hierarchy generation.
///
/// The value changes whenever a category relationship is declared or
/// dropped in any hierarchy of the process.
pub fn current_generation() -> u64 {
    GENERATION.load(Ordering::Acquire)
}

/// Advances the process-wide hierarchy generation and returns the new value.
pub(crate) fn advance_generation() -> u64 {
    GENERATION.fetch_add(1, Ordering::AcqRel) + 1
}

/// Read-only view of a type hierarchy, as needed by linearization and
/// dispatch.
///
/// Implementations answer every query for ids that are not live with an
/// empty or negative result rather than failing.
pub trait TypeSystem {
    /// The universal root type. Present in every linearization.
    fn root(&self) -> TypeId;

    /// Whether `ty` names a type that currently exists.
    fn is_live(&self, ty: TypeId) -> bool;

    /// Display name of `ty`.
    fn name(&self, ty: TypeId) -> String;

    /// Finds a live type by name.
    fn lookup(&self, name: &str) -> Option<TypeId>;

    /// Direct declared parents of `ty`, in declaration order.
    fn bases(&self, ty: TypeId) -> Vec<TypeId>;

    /// Declared-only linearization of `ty`, starting with `ty` itself.
    fn mro(&self, ty: TypeId) -> Vec<TypeId>;

    /// Whether `ty` satisfies `of`, through declared inheritance or through
    /// category relationships.
    fn is_subtype(&self, ty: TypeId, of: TypeId) -> bool;

    /// Whether `ty` is a category or has a category among its declared
    /// ancestors.
    fn is_abstract(&self, ty: TypeId) -> bool;

    /// Types that list `ty` among their declared parents, in definition order.
    fn subclasses(&self, ty: TypeId) -> Vec<TypeId>;

    /// Counter that changes whenever any category relationship changes.
    fn generation(&self) -> u64 {
        current_generation()
    }
}
