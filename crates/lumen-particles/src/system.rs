//! Frame driver: emit, despawn, step, voxelize

use crate::config::{RenderConfig, SimulationConfig};
use crate::emitter::{despawn_old_particles, despawn_out_of_bounds, Emitter};
use crate::engine::PhysicsEngine;
use crate::render::{render_into, VoxelGrid};
use crate::state::ParticleState;
use lumen_core::{GridShape, Result};

/// Per-frame counters reported by [`ParticleSystem::frame`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub emitted: usize,
    pub despawned: usize,
    pub active: usize,
    pub voxels: usize,
}

/// A pool, an engine and a set of emitters advanced together one frame at
/// a time, with the result rasterized into a reused occupancy grid.
pub struct ParticleSystem {
    pub state: ParticleState,
    pub engine: PhysicsEngine,
    pub render: RenderConfig,
    /// Particles older than this are despawned before each step
    pub max_age: Option<f32>,
    pub despawn_out_of_bounds: bool,
    emitters: Vec<Box<dyn Emitter>>,
    grid: VoxelGrid,
    total_emitted: u64,
    frames: u64,
    last: FrameStats,
}

impl ParticleSystem {
    /// Assemble a system by hand. No emitters, no age limit.
    pub fn new(state: ParticleState, engine: PhysicsEngine, shape: GridShape) -> Self {
        Self {
            state,
            engine,
            render: RenderConfig::default(),
            max_age: None,
            despawn_out_of_bounds: false,
            emitters: Vec::new(),
            grid: VoxelGrid::new(shape),
            total_emitted: 0,
            frames: 0,
            last: FrameStats::default(),
        }
    }

    /// Validate `config` and build everything it describes. Without a
    /// configured seed one is drawn from the OS.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        log::debug!(
            "particle system: {} slots, {} force(s), {} constraint(s), {} emitter(s), seed {seed}",
            config.engine.pool_size,
            config.forces.len(),
            config.constraints.len(),
            config.emitters.len()
        );

        let mut system = Self::new(
            ParticleState::new(config.engine.pool_size),
            config.build_engine(seed),
            config.grid.shape,
        );
        system.render = config.render.clone();
        system.max_age = config.max_age();
        system.despawn_out_of_bounds = config.lifecycle.despawn_out_of_bounds;
        system.emitters = config.build_emitters(seed);
        Ok(system)
    }

    pub fn add_emitter(&mut self, emitter: Box<dyn Emitter>) {
        log::debug!("add emitter {}", emitter.name());
        self.emitters.push(emitter);
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Advance one frame at simulated time `t` and return the new grid.
    ///
    /// Order: every emitter emits for one `dt`, over-age particles die, the
    /// engine steps, out-of-bounds particles die (if enabled), then the
    /// surviving particles are voxelized.
    pub fn frame(&mut self, t: f32) -> &VoxelGrid {
        let dt = self.engine.dt;
        let mut stats = FrameStats::default();

        for emitter in &mut self.emitters {
            stats.emitted += emitter.emit(&mut self.state, t, dt);
        }
        if let Some(max_age) = self.max_age {
            stats.despawned += despawn_old_particles(&mut self.state, max_age);
        }

        self.engine.step(&mut self.state, t);

        if self.despawn_out_of_bounds {
            stats.despawned +=
                despawn_out_of_bounds(&mut self.state, self.engine.bounds_min, self.engine.bounds_max);
        }

        render_into(&mut self.grid, &self.state, self.render.mode, self.render.motion_blur);

        stats.active = self.state.active_count();
        stats.voxels = self.grid.count();
        self.total_emitted += stats.emitted as u64;
        self.frames += 1;
        self.last = stats;
        log::trace!("frame {} t={t:.3}: {stats:?}", self.frames);
        &self.grid
    }

    /// Occupancy grid from the most recent frame
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last
    }

    pub fn total_emitted(&self) -> u64 {
        self.total_emitted
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}
