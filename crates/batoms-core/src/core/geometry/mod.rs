//! # Geometry Module
//!
//! Geometric primitives shared by the models and the engine.
//!
//! - [`mesh`] - Polygon meshes for species instances, with UV sphere, ico-sphere and
//!   cube generators and Newell face normals
//! - [`placement`] - The translation, rotation and scale taking local site positions to
//!   the global frame
//! - [`lattice`] - Unit cells, supercell replica offsets and fractional coordinates

pub mod lattice;
pub mod mesh;
pub mod placement;
