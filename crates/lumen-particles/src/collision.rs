//! Particle-particle collision with naive and spatial-hash broad phases
//!
//! Both strategies feed candidate pairs `(i, j)`, `i < j`, to the same
//! narrow phase in ascending pair order, so for the same input they resolve
//! the same collisions in the same order.

use crate::constraints::Constraint;
use crate::state::ParticleState;
use glam::{IVec3, Vec3};
use std::collections::HashMap;

/// Spatial hash cell edge as a multiple of the largest active radius.
/// Anything above 2 guarantees colliding pairs share or neighbor a cell.
const CELL_SIZE_FACTOR: f32 = 2.5;

/// Broad-phase strategy for pair detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionStrategy {
    /// Every pair of active particles, O(N^2)
    Naive,
    /// Uniform grid bucketing with a 27-cell neighborhood, near O(N)
    SpatialHash,
}

/// Impulse-based collision between overlapping active particles.
pub struct ParticleCollision {
    pub enabled: bool,
    pub restitution: f32,
    pub strategy: CollisionStrategy,
    /// Reused between steps to avoid reallocating per frame
    cells: HashMap<IVec3, Vec<usize>>,
    pairs: Vec<(usize, usize)>,
    active: Vec<usize>,
}

impl ParticleCollision {
    pub fn new(enabled: bool, restitution: f32, strategy: CollisionStrategy) -> Self {
        Self {
            enabled,
            restitution,
            strategy,
            cells: HashMap::new(),
            pairs: Vec::new(),
            active: Vec::new(),
        }
    }

    /// Collect candidate pairs for the configured strategy into `self.pairs`,
    /// sorted and free of duplicates.
    fn broad_phase(&mut self, state: &ParticleState) {
        self.pairs.clear();
        self.active.clear();
        self.active.extend(state.active_indices());
        if self.active.len() < 2 {
            return;
        }

        match self.strategy {
            CollisionStrategy::Naive => {
                for (a, &i) in self.active.iter().enumerate() {
                    for &j in &self.active[a + 1..] {
                        self.pairs.push((i, j));
                    }
                }
            }
            CollisionStrategy::SpatialHash => {
                let max_radius = self
                    .active
                    .iter()
                    .map(|&i| state.radius[i])
                    .fold(0.0f32, f32::max);
                if max_radius <= 0.0 {
                    return;
                }
                let cell_size = max_radius * CELL_SIZE_FACTOR;

                for bucket in self.cells.values_mut() {
                    bucket.clear();
                }
                for &i in &self.active {
                    let cell = (state.position[i] / cell_size).floor().as_ivec3();
                    self.cells.entry(cell).or_default().push(i);
                }
                self.cells.retain(|_, bucket| !bucket.is_empty());

                for (&cell, bucket) in &self.cells {
                    for dx in -1..=1 {
                        for dy in -1..=1 {
                            for dz in -1..=1 {
                                let neighbor = cell + IVec3::new(dx, dy, dz);
                                let Some(others) = self.cells.get(&neighbor) else {
                                    continue;
                                };
                                for &i in bucket {
                                    for &j in others {
                                        if i < j {
                                            self.pairs.push((i, j));
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                self.pairs.sort_unstable();
                self.pairs.dedup();
            }
        }
    }
}

/// Particle collision constraint; disabled returns a no-op.
///
/// `spatial_hash` selects the grid broad phase over the all-pairs one.
pub fn particle_particle_collision(enabled: bool, restitution: f32, spatial_hash: bool) -> ParticleCollision {
    let strategy = if spatial_hash {
        CollisionStrategy::SpatialHash
    } else {
        CollisionStrategy::Naive
    };
    ParticleCollision::new(enabled, restitution, strategy)
}

impl Constraint for ParticleCollision {
    fn apply(&mut self, state: &mut ParticleState) {
        if !self.enabled {
            return;
        }
        self.broad_phase(state);
        let mut resolved = 0usize;
        for &(i, j) in &self.pairs {
            if resolve_pair(state, i, j, self.restitution) {
                resolved += 1;
            }
        }
        if resolved > 0 {
            log::trace!(
                "{:?} collision: {} candidate pairs, {} resolved",
                self.strategy,
                self.pairs.len(),
                resolved
            );
        }
    }

    fn name(&self) -> &str {
        match (self.enabled, self.strategy) {
            (false, _) => "particle_particle_collision_disabled",
            (true, CollisionStrategy::Naive) => "particle_particle_collision",
            (true, CollisionStrategy::SpatialHash) => "particle_particle_collision_spatial_hash",
        }
    }
}

/// Narrow phase for one pair. Returns true when an impulse was applied.
///
/// The normal points from `i` to `j`. Only approaching pairs are resolved:
/// `impulse = -(1 + e) (v_rel . n) / (1/m_i + 1/m_j)` is applied with opposite
/// signs, then each particle is pushed apart by half the overlap.
fn resolve_pair(state: &mut ParticleState, i: usize, j: usize, restitution: f32) -> bool {
    let diff = state.position[j] - state.position[i];
    let distance = diff.length();
    let radii_sum = state.radius[i] + state.radius[j];
    if distance >= radii_sum || distance <= 0.0 {
        return false;
    }

    let normal = diff / distance;
    let closing = (state.velocity[j] - state.velocity[i]).dot(normal);
    if closing >= 0.0 {
        return false;
    }

    let (mi, mj) = (state.mass[i], state.mass[j]);
    debug_assert!(mi > 0.0 && mj > 0.0, "colliding particles need positive mass");
    let impulse = -(1.0 + restitution) * closing / (1.0 / mi + 1.0 / mj);
    state.velocity[i] -= normal * (impulse / mi);
    state.velocity[j] += normal * (impulse / mj);

    let separation: Vec3 = normal * ((radii_sum - distance) / 2.0);
    state.position[i] -= separation;
    state.position[j] += separation;
    true
}
