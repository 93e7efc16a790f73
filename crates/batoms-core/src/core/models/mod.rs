//! # Core Models Module
//!
//! Plain data types describing a structure: sites, species and their element
//! occupancies, the shared render instances of species, per-site attribute columns
//! and trajectory frames.
//!
//! ## Key Components
//!
//! - [`site`] - One atomic site with its local position and display attributes
//! - [`species`] - Element compositions, validated occupancy tables and species
//! - [`instance`] - Instance shapes, materials and the shared render proxy
//! - [`attributes`] - Typed per-site attribute columns
//! - [`selection`] - Site selection by mask or by index list
//! - [`timeline`] - Trajectory frames and their interpolation keypoints
//! - [`ids`] - Key types for slot map storage
//!
//! These types carry no cross-object bookkeeping; the registry and the site
//! collection keep them consistent.

pub mod attributes;
pub mod ids;
pub mod instance;
pub mod selection;
pub mod site;
pub mod species;
pub mod timeline;
