//! # Core Module
//!
//! Stateless building blocks for turning atomistic structures into instanced scene
//! objects.
//!
//! - **Element Data** ([`elements`]) - Radius and colour tables keyed by element symbol
//! - **Models** ([`models`]) - Sites, species, occupancy tables, instances and frames
//! - **Geometry** ([`geometry`]) - Instance meshes, placement transforms and unit cells
//! - **Structure Input** ([`io`]) - The TOML structure description
//!
//! Nothing here keeps cross-object state; that is the job of the [`crate::engine`]
//! registry and the [`crate::workflows`] site collection.

pub mod elements;
pub mod geometry;
pub mod io;
pub mod models;
