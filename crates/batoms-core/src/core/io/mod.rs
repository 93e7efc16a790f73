//! Loading of structure descriptions.
//!
//! Atomic-structure file formats are read elsewhere; this module only understands the
//! TOML description consumed by the build workflow.

pub mod structure;
