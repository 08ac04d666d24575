//! Type-directed single dispatch.
//!
//! Given handlers registered for types and for categories (abstract
//! groupings that types can be linked to after they are defined), select the
//! most specific handler for a runtime type.
//!
//! ```
//! use std::sync::Arc;
//! use typedispatch::{Collections, DispatchTable, TypeHierarchy};
//!
//! let types = Arc::new(TypeHierarchy::new());
//! let c = Collections::install(&types).unwrap();
//!
//! let mut table = DispatchTable::new(Arc::clone(&types), "object");
//! table.register(c.sized, "sized").unwrap();
//! table.register(c.mutable_mapping, "mutable mapping").unwrap();
//!
//! assert_eq!(*table.resolve(c.list).unwrap(), "sized");
//! assert_eq!(*table.resolve(c.ordered_dict).unwrap(), "mutable mapping");
//! assert_eq!(*table.resolve(c.int).unwrap(), "object");
//! ```
//!
//! # Module Structure
//!
//! - [`hierarchy`] - Type ids, the `TypeSystem` seam and `TypeHierarchy`
//! - [`linearize`] - Extended C3 linearization
//! - [`dispatch`] - Dispatch tables, keys and the resolution cache
//! - [`generic`] - Thread-safe callable wrapper around a table
//! - [`builtins`] - A ready-made collections hierarchy
//! - [`config`] - Table configuration
//! - [`error`] - Error types

pub mod builtins;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod generic;
pub mod hierarchy;
pub mod linearize;

pub use builtins::Collections;
pub use config::{CacheConfig, DispatchConfig};
pub use dispatch::{DispatchKey, DispatchTable, PendingRegistration, RegistryView};
pub use error::{ConfigError, DispatchError, DispatchResult, HierarchyError, HierarchyResult};
pub use generic::{GenericFunction, Handler, Instance};
pub use hierarchy::{current_generation, TypeHierarchy, TypeId, TypeKind, TypeSystem};
pub use linearize::{c3_linearize, c3_merge, linearize};
