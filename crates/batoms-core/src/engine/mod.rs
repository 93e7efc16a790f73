//! # Engine Module
//!
//! The stateful layer that keeps species definitions, their shared render instances
//! and the host scene consistent with each other.
//!
//! ## Architecture
//!
//! - **Species Registry** ([`registry`]) - Species definitions, one instance per species,
//!   and reference counts from the sites that use them
//! - **Occupancy Colouring** ([`occupancy`]) - Splits instance faces into angular wedges
//!   proportional to element occupancies
//! - **Scene Backend** ([`backend`]) - The interface to the host scene, plus an in-memory
//!   implementation
//! - **Configuration** ([`config`]) - Registry defaults and their builder
//! - **Error Handling** ([`error`]) - The error type shared by every engine and workflow
//!   operation, with its classification into validation, referential integrity and
//!   unsupported configuration failures
//!
//! Every command validates its input before touching state, so a failed command leaves
//! the registry exactly as it was.

pub mod backend;
pub mod config;
pub mod error;
pub mod occupancy;
pub mod registry;
