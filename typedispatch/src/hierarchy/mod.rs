//! Type hierarchy consumed by the dispatch core.
//!
//! The core never inspects types directly. Everything it needs (declared
//! parents, satisfaction checks, declared subclasses and the generation
//! counter) goes through the [`TypeSystem`] trait. [`TypeHierarchy`] is the
//! stock implementation: an arena of type records plus an explicit table of
//! category relations declared after the fact.
//!
//! # Module Structure
//!
//! - [`types`] - `TypeId` and `TypeKind`
//! - [`system`] - The `TypeSystem` trait and the process-wide generation
//! - [`store`] - `TypeHierarchy`

mod store;
mod system;
mod types;

pub use store::TypeHierarchy;
pub use system::{current_generation, TypeSystem};
pub use types::{TypeId, TypeKind};
