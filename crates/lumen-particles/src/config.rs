//! Simulation configuration (parsed from TOML)
//!
//! A [`SimulationConfig`] describes a whole scene: grid, engine, render
//! settings, and the ordered force, constraint and emitter lists. Loading
//! validates the document so nothing degenerate reaches the step loop.

use crate::collision::particle_particle_collision;
use crate::constraints::{boundary_collision, boundary_wrap, sphere_collision, Constraint};
use crate::emitter::{Emitter, ParticleEmitter, ParticleEmitterConfig, VolumeEmitter, VolumeEmitterConfig};
use crate::engine::{BoundaryMode, PhysicsEngine};
use crate::forces::{drag, gravity, gravity_well, spring, vortex, wind, Force};
use crate::render::RenderMode;
use glam::Vec3;
use lumen_core::{Bounds3, GridShape, LumenError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level scene description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base seed for emitters and wind turbulence; random when absent
    pub seed: Option<u64>,
    pub grid: GridConfig,
    pub engine: EngineConfig,
    pub render: RenderConfig,
    pub lifecycle: LifecycleConfig,
    pub forces: Vec<ForceConfig>,
    pub constraints: Vec<ConstraintConfig>,
    pub emitters: Vec<EmitterConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub shape: GridShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dt: f32,
    pub pool_size: usize,
    pub boundary: BoundaryMode,
    /// Wall restitution for [`BoundaryMode::Bounce`]
    pub restitution: f32,
    /// Defaults to the grid origin
    pub bounds_min: Option<Vec3>,
    /// Defaults to the last voxel of the grid
    pub bounds_max: Option<Vec3>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dt: 0.016,
            pool_size: 200,
            boundary: BoundaryMode::Bounce,
            restitution: 0.8,
            bounds_min: None,
            bounds_max: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,
    pub motion_blur: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Defaults to the longest emitter lifetime
    pub max_age: Option<f32>,
    pub despawn_out_of_bounds: bool,
}

/// One `[[forces]]` entry, selected by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForceConfig {
    Gravity {
        #[serde(default = "default_g")]
        g: f32,
        #[serde(default = "default_gravity_axis")]
        axis: usize,
    },
    Drag {
        #[serde(default = "default_drag")]
        coefficient: f32,
    },
    Wind {
        direction: Vec3,
        #[serde(default = "one")]
        strength: f32,
        #[serde(default)]
        turbulence: f32,
    },
    GravityWell {
        center: Vec3,
        #[serde(default = "default_well_strength")]
        strength: f32,
        #[serde(default = "default_min_distance")]
        min_distance: f32,
    },
    Spring {
        /// One anchor per pool slot, in slot order
        anchors: Vec<Vec3>,
        #[serde(default = "default_stiffness")]
        stiffness: f32,
        #[serde(default = "default_spring_damping")]
        damping: f32,
    },
    Vortex {
        center: Vec3,
        #[serde(default = "default_vortex_axis")]
        axis: Vec3,
        #[serde(default = "default_vortex_strength")]
        strength: f32,
        #[serde(default = "default_vortex_radius")]
        radius: f32,
    },
}

/// One `[[constraints]]` entry, selected by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintConfig {
    /// Walls default to the engine bounds
    BoundaryCollision {
        #[serde(default)]
        bounds_min: Option<Vec3>,
        #[serde(default)]
        bounds_max: Option<Vec3>,
        #[serde(default = "default_wall_restitution")]
        restitution: f32,
    },
    BoundaryWrap {
        #[serde(default)]
        bounds_min: Option<Vec3>,
        #[serde(default)]
        bounds_max: Option<Vec3>,
    },
    ParticleCollision {
        #[serde(default = "yes")]
        enabled: bool,
        #[serde(default = "default_particle_restitution")]
        restitution: f32,
        #[serde(default = "yes")]
        spatial_hash: bool,
    },
    SphereCollision {
        center: Vec3,
        radius: f32,
        #[serde(default = "default_sphere_restitution")]
        restitution: f32,
        #[serde(default)]
        inside: bool,
    },
}

/// One `[[emitters]]` entry, selected by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmitterConfig {
    Point(ParticleEmitterConfig),
    Volume(VolumeEmitterConfig),
}

fn default_g() -> f32 {
    -9.8
}
fn default_gravity_axis() -> usize {
    2
}
fn default_drag() -> f32 {
    0.1
}
fn one() -> f32 {
    1.0
}
fn default_well_strength() -> f32 {
    10.0
}
fn default_min_distance() -> f32 {
    0.1
}
fn default_stiffness() -> f32 {
    10.0
}
fn default_spring_damping() -> f32 {
    0.5
}
fn default_vortex_axis() -> Vec3 {
    Vec3::Z
}
fn default_vortex_strength() -> f32 {
    5.0
}
fn default_vortex_radius() -> f32 {
    10.0
}
fn default_wall_restitution() -> f32 {
    0.8
}
fn default_particle_restitution() -> f32 {
    0.7
}
fn default_sphere_restitution() -> f32 {
    0.9
}
fn yes() -> bool {
    true
}

/// Largest accepted grid, in voxels
pub const MAX_GRID_VOXELS: usize = 1 << 24;
/// Largest accepted particle pool
pub const MAX_POOL_SIZE: usize = 10_000;

fn invalid(msg: impl Into<String>) -> LumenError {
    LumenError::InvalidConfig(msg.into())
}

fn require_nonzero(field: &str, v: Vec3) -> Result<()> {
    if v.length_squared() > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be a non-zero vector, got {v}")))
    }
}

fn require_positive(field: &str, value: f32) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be positive, got {value}")))
    }
}

fn require_box(field: &str, min: Vec3, max: Vec3) -> Result<()> {
    if Bounds3::new(min, max).is_valid() {
        Ok(())
    } else {
        Err(invalid(format!("{field}: min {min} exceeds max {max}")))
    }
}

impl SimulationConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Simulation domain: the engine bounds if given, else derived from the
    /// grid. Bounded domains span the voxel centers `[0, shape - 1]`; a
    /// wrapping domain spans `[0, shape]` so its period is the grid size.
    pub fn bounds(&self) -> Bounds3 {
        let grid = Bounds3::for_grid(self.grid.shape);
        let default_max = match self.engine.boundary {
            BoundaryMode::Wrap => self.grid.shape.extent(),
            BoundaryMode::Bounce | BoundaryMode::None => grid.max,
        };
        Bounds3::new(
            self.engine.bounds_min.unwrap_or(grid.min),
            self.engine.bounds_max.unwrap_or(default_max),
        )
    }

    /// Age limit for despawning, if any emitter or explicit limit sets one
    pub fn max_age(&self) -> Option<f32> {
        self.lifecycle.max_age.or_else(|| {
            self.emitters
                .iter()
                .map(EmitterConfig::particle_lifetime)
                .reduce(f32::max)
        })
    }

    /// Reject degenerate geometry and out-of-range parameters
    pub fn validate(&self) -> Result<()> {
        let [d0, d1, d2] = self.grid.shape.dims();
        if d0 == 0 || d1 == 0 || d2 == 0 {
            return Err(invalid(format!(
                "grid.shape must be non-zero on every axis, got [{d0}, {d1}, {d2}]"
            )));
        }
        match self.grid.shape.checked_len() {
            Some(voxels) if voxels <= MAX_GRID_VOXELS => {}
            _ => {
                return Err(invalid(format!(
                    "grid.shape [{d0}, {d1}, {d2}] exceeds {MAX_GRID_VOXELS} voxels"
                )))
            }
        }
        require_positive("engine.dt", self.engine.dt)?;
        if self.engine.pool_size == 0 || self.engine.pool_size > MAX_POOL_SIZE {
            return Err(LumenError::ValueOutOfRange {
                field: "engine.pool_size".into(),
                min: 1.0,
                max: MAX_POOL_SIZE as f64,
                value: self.engine.pool_size as f64,
            });
        }
        let bounds = self.bounds();
        require_box("engine bounds", bounds.min, bounds.max)?;
        if let Some(max_age) = self.lifecycle.max_age {
            require_positive("lifecycle.max_age", max_age)?;
        }

        for (i, force) in self.forces.iter().enumerate() {
            force.validate(&format!("forces[{i}]"))?;
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            constraint.validate(&format!("constraints[{i}]"), bounds)?;
        }
        for (i, emitter) in self.emitters.iter().enumerate() {
            emitter.validate(&format!("emitters[{i}]"))?;
        }
        Ok(())
    }

    /// Build an engine with every configured force and constraint
    /// registered in document order, followed by the wall constraint for
    /// `engine.boundary`.
    ///
    /// Turbulent wind fields are seeded from `seed` and their list index.
    pub fn build_engine(&self, seed: u64) -> PhysicsEngine {
        let bounds = self.bounds();
        let mut engine = PhysicsEngine::new(bounds.min, bounds.max, self.engine.dt, self.engine.boundary);
        for (i, force) in self.forces.iter().enumerate() {
            engine.add_boxed_force(force.build(derive_seed(seed, i)));
        }
        for constraint in &self.constraints {
            engine.add_boxed_constraint(constraint.build(bounds));
        }
        if let Some(walls) = engine.boundary_constraint(self.engine.restitution) {
            engine.add_boxed_constraint(walls);
        }
        engine
    }

    /// Build the emitters in document order, each with its own seed
    pub fn build_emitters(&self, seed: u64) -> Vec<Box<dyn Emitter>> {
        self.emitters
            .iter()
            .enumerate()
            // numbered after the forces so no two components share a seed
            .map(|(i, e)| e.build(derive_seed(seed, self.forces.len() + i)))
            .collect()
    }
}

/// Decorrelate per-component seeds drawn from one base seed
fn derive_seed(base: u64, index: usize) -> u64 {
    base.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

impl ForceConfig {
    pub fn validate(&self, at: &str) -> Result<()> {
        match self {
            ForceConfig::Gravity { axis, .. } => {
                if *axis > 2 {
                    return Err(LumenError::ValueOutOfRange {
                        field: format!("{at}.axis"),
                        min: 0.0,
                        max: 2.0,
                        value: *axis as f64,
                    });
                }
            }
            ForceConfig::Drag { .. } => {}
            ForceConfig::Wind { direction, .. } => require_nonzero(&format!("{at}.direction"), *direction)?,
            ForceConfig::GravityWell { min_distance, .. } => {
                require_positive(&format!("{at}.min_distance"), *min_distance)?
            }
            ForceConfig::Spring { .. } => {}
            ForceConfig::Vortex { axis, radius, .. } => {
                require_nonzero(&format!("{at}.axis"), *axis)?;
                require_positive(&format!("{at}.radius"), *radius)?;
            }
        }
        Ok(())
    }

    pub fn build(&self, seed: u64) -> Box<dyn Force> {
        match self {
            ForceConfig::Gravity { g, axis } => Box::new(gravity(*g, *axis)),
            ForceConfig::Drag { coefficient } => Box::new(drag(*coefficient)),
            ForceConfig::Wind {
                direction,
                strength,
                turbulence,
            } => Box::new(wind(*direction, *strength, *turbulence).with_seed(seed)),
            ForceConfig::GravityWell {
                center,
                strength,
                min_distance,
            } => Box::new(gravity_well(*center, *strength, *min_distance)),
            ForceConfig::Spring {
                anchors,
                stiffness,
                damping,
            } => Box::new(spring(anchors.clone(), *stiffness, *damping)),
            ForceConfig::Vortex {
                center,
                axis,
                strength,
                radius,
            } => Box::new(vortex(*center, *axis, *strength, *radius)),
        }
    }
}

impl ConstraintConfig {
    /// `bounds` is the engine domain that unset wall bounds fall back to
    pub fn validate(&self, at: &str, bounds: Bounds3) -> Result<()> {
        match self {
            ConstraintConfig::BoundaryCollision {
                bounds_min, bounds_max, ..
            }
            | ConstraintConfig::BoundaryWrap { bounds_min, bounds_max } => require_box(
                at,
                bounds_min.unwrap_or(bounds.min),
                bounds_max.unwrap_or(bounds.max),
            ),
            ConstraintConfig::SphereCollision { radius, .. } => {
                require_positive(&format!("{at}.radius"), *radius)
            }
            ConstraintConfig::ParticleCollision { .. } => Ok(()),
        }
    }

    /// Build the constraint; missing wall bounds fall back to `bounds`
    pub fn build(&self, bounds: Bounds3) -> Box<dyn Constraint> {
        match self {
            ConstraintConfig::BoundaryCollision {
                bounds_min,
                bounds_max,
                restitution,
            } => Box::new(boundary_collision(
                bounds_min.unwrap_or(bounds.min),
                bounds_max.unwrap_or(bounds.max),
                *restitution,
            )),
            ConstraintConfig::BoundaryWrap { bounds_min, bounds_max } => Box::new(boundary_wrap(
                bounds_min.unwrap_or(bounds.min),
                bounds_max.unwrap_or(bounds.max),
            )),
            ConstraintConfig::ParticleCollision {
                enabled,
                restitution,
                spatial_hash,
            } => Box::new(particle_particle_collision(*enabled, *restitution, *spatial_hash)),
            ConstraintConfig::SphereCollision {
                center,
                radius,
                restitution,
                inside,
            } => Box::new(sphere_collision(*center, *radius, *restitution, *inside)),
        }
    }
}

impl EmitterConfig {
    pub fn particle_lifetime(&self) -> f32 {
        match self {
            EmitterConfig::Point(c) => c.particle_lifetime,
            EmitterConfig::Volume(c) => c.particle_lifetime,
        }
    }

    pub fn validate(&self, at: &str) -> Result<()> {
        let (rate, lifetime, radius, mass) = match self {
            EmitterConfig::Point(c) => {
                require_nonzero(&format!("{at}.direction"), c.direction)?;
                if c.velocity_min > c.velocity_max {
                    return Err(invalid(format!(
                        "{at}: velocity_min {} exceeds velocity_max {}",
                        c.velocity_min, c.velocity_max
                    )));
                }
                (c.rate, c.particle_lifetime, c.particle_radius, c.particle_mass)
            }
            EmitterConfig::Volume(c) => {
                require_box(at, c.bounds_min, c.bounds_max)?;
                (c.rate, c.particle_lifetime, c.particle_radius, c.particle_mass)
            }
        };
        if rate < 0.0 {
            return Err(invalid(format!("{at}.rate must not be negative, got {rate}")));
        }
        require_positive(&format!("{at}.particle_lifetime"), lifetime)?;
        require_positive(&format!("{at}.particle_radius"), radius)?;
        require_positive(&format!("{at}.particle_mass"), mass)
    }

    pub fn build(&self, seed: u64) -> Box<dyn Emitter> {
        match self {
            EmitterConfig::Point(c) => Box::new(ParticleEmitter::new(c, seed)),
            EmitterConfig::Volume(c) => Box::new(VolumeEmitter::new(c, seed)),
        }
    }
}
