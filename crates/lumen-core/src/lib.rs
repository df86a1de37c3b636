//! Lumen Core - Foundational types for the Lumen volumetric display engine
//!
//! This crate provides the types the other Lumen crates share:
//! - `GridShape` - Dimensions of the physical voxel grid
//! - `Bounds3` - Axis-aligned continuous simulation bounds
//! - Error types and Result alias

mod error;
mod types;

pub use error::{LumenError, Result};
pub use types::{Bounds3, GridShape};
