//! # Workflows Module
//!
//! The user-facing entry points of the library.
//!
//! - [`collection`] - [`collection::SiteCollection`], an ordered set of atomic sites with
//!   its species registry, trajectory, custom attributes and scene publishing
//! - [`build`] - Turns a [`crate::core::io::structure::StructureFile`] into a ready
//!   collection: species definitions, styles, cell, repeat and placement
//!
//! A typical session loads a structure description, builds the collection, edits it
//! through its commands and publishes it into a [`crate::engine::backend::SceneBackend`].

pub mod build;
pub mod collection;
