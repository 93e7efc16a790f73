//! # batoms Core Library
//!
//! Atomistic structures as instanced scene objects: one vertex per atomic site, one
//! shared sphere (or cube) per species, with fractional occupancies drawn as coloured
//! wedges and trajectories stored as interpolated shape keys.
//!
//! ## Architecture
//!
//! The library is split into three layers.
//!
//! - **[`core`]: The Foundation.** Stateless data: element tables, sites, species and
//!   their occupancy tables, meshes, placements, unit cells and the TOML structure
//!   description.
//!
//! - **[`engine`]: The Logic Core.** The [`engine::registry::SpeciesRegistry`] owning
//!   species and their instances, the occupancy colour assigner, and the
//!   [`engine::backend::SceneBackend`] seam to the host scene.
//!
//! - **[`workflows`]: The Public API.** The [`workflows::collection::SiteCollection`]
//!   with its create, repeat, extend, delete and frame operations, and
//!   [`workflows::build::build`] turning a structure description into a collection.

pub mod core;
pub mod engine;
pub mod workflows;
