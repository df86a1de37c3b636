//! Lumen Particles - particle physics for volumetric voxel displays
//!
//! Provides a pooled particle simulation with:
//! - Structure-of-arrays particle pool with fixed capacity
//! - Velocity Verlet integration over pluggable forces and constraints
//! - Naive and spatial-hash particle-particle collision
//! - Point/cone and volume emitters with lifetime management
//! - Voxelization of particles into a boolean occupancy grid
//! - TOML scene configuration and a frame driver

pub mod collision;
pub mod config;
pub mod constraints;
pub mod emitter;
pub mod engine;
pub mod forces;
pub mod render;
pub mod rng;
pub mod state;
pub mod system;

pub use collision::{particle_particle_collision, CollisionStrategy, ParticleCollision};
pub use config::{ConstraintConfig, EmitterConfig, ForceConfig, SimulationConfig};
pub use constraints::{boundary_collision, boundary_wrap, sphere_collision, Constraint};
pub use emitter::{
    despawn_old_particles, despawn_out_of_bounds, Emitter, ParticleEmitter, ParticleEmitterConfig,
    VolumeEmitter, VolumeEmitterConfig,
};
pub use engine::{BoundaryMode, ConstraintId, ForceId, PhysicsEngine};
pub use forces::{drag, gravity, gravity_well, spring, vortex, wind, Force};
pub use render::{draw_line_3d, draw_sphere, in_bounds, particles_to_voxels, RenderMode, VoxelGrid};
pub use rng::ParticleRng;
pub use state::ParticleState;
pub use system::{FrameStats, ParticleSystem};
