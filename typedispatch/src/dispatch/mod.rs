//! Single dispatch over a type hierarchy.
//!
//! A [`DispatchTable`] binds types and categories to handlers and selects,
//! for a runtime type, the most specific binding. Only the first argument's
//! type takes part in selection.
//!
//! # Algorithm Overview
//!
//! 1. **Check generation**: if a category key was ever registered and the
//!    hierarchy generation moved, drop the cache
//! 2. **Cache lookup**: return the memoized match for the concrete type
//! 3. **Linearize**: order the type's hierarchy, inserting every registered
//!    category it satisfies (see [`crate::linearize`])
//! 4. **Walk**: the first bound type wins, unless the next bound type is an
//!    unrelated inferred category, which is an ambiguity
//!
//! # Module Structure
//!
//! - [`key`] - Registration keys (single type or union)
//! - [`cache`] - Resolution cache with lazy sweeping of retired types
//! - [`table`] - Registry, resolution and invalidation

mod cache;
mod key;
mod table;


pub use cache::ResolutionCache;
pub use key::DispatchKey;
pub use table::{DispatchTable, PendingRegistration, RegistryView};
