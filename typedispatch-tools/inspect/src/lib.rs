//! Dispatch manifest inspector.
//!
//! Loads a TOML manifest describing a type hierarchy and a handler table,
//! then answers questions about it: linearizations, which handler each type
//! reaches, and whether any type resolves ambiguously.

pub mod inspector;
pub mod manifest;

pub use inspector::{Binding, CheckReport, Inspector, Outcome, Resolution};
pub use manifest::{DispatchDecl, HandlerDecl, Manifest, ManifestError, ManifestResult, TypeDecl, VirtualDecl};
