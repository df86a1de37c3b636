//! Pooled particle state: fixed-capacity parallel arrays indexed by slot

use glam::Vec3;

/// Mass given to every slot of a fresh pool
pub const DEFAULT_MASS: f32 = 1.0;
/// Radius given to every slot of a fresh pool
pub const DEFAULT_RADIUS: f32 = 1.5;

/// Fixed-capacity particle pool in structure-of-arrays layout.
///
/// A particle's identity is its slot index. Slots are never reallocated or
/// reordered: despawning clears `active` and the slot becomes eligible for
/// reuse by any emitter. The arrays are boxed slices so their length is fixed
/// for the lifetime of the pool.
///
/// The fields of an inactive slot are stale and carry no meaning until an
/// emitter activates the slot again.
#[derive(Clone, Debug)]
pub struct ParticleState {
    pub position: Box<[Vec3]>,
    pub velocity: Box<[Vec3]>,
    pub acceleration: Box<[Vec3]>,
    /// Position before the most recent integration step (motion blur)
    pub prev_position: Box<[Vec3]>,
    pub mass: Box<[f32]>,
    pub radius: Box<[f32]>,
    /// Seconds since spawn
    pub age: Box<[f32]>,
    pub active: Box<[bool]>,
}

impl ParticleState {
    /// Create a pool of `capacity` inactive slots with default mass and radius
    pub fn new(capacity: usize) -> Self {
        Self {
            position: vec![Vec3::ZERO; capacity].into_boxed_slice(),
            velocity: vec![Vec3::ZERO; capacity].into_boxed_slice(),
            acceleration: vec![Vec3::ZERO; capacity].into_boxed_slice(),
            prev_position: vec![Vec3::ZERO; capacity].into_boxed_slice(),
            mass: vec![DEFAULT_MASS; capacity].into_boxed_slice(),
            radius: vec![DEFAULT_RADIUS; capacity].into_boxed_slice(),
            age: vec![0.0; capacity].into_boxed_slice(),
            active: vec![false; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.active.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    pub fn any_active(&self) -> bool {
        self.active.iter().any(|&a| a)
    }

    /// Indices of active slots in ascending order
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| a.then_some(i))
    }

    /// Indices of inactive slots in ascending order
    pub fn free_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| (!a).then_some(i))
    }

    /// Initialize every field of slot `idx` and mark it active.
    ///
    /// `prev_position` starts equal to `position` so a fresh particle never
    /// draws a motion-blur streak from stale data.
    pub fn activate(&mut self, idx: usize, position: Vec3, velocity: Vec3, radius: f32, mass: f32) {
        debug_assert!(mass > 0.0, "active particles must have positive mass");
        self.position[idx] = position;
        self.prev_position[idx] = position;
        self.velocity[idx] = velocity;
        self.acceleration[idx] = Vec3::ZERO;
        self.radius[idx] = radius;
        self.mass[idx] = mass;
        self.age[idx] = 0.0;
        self.active[idx] = true;
    }

    pub fn deactivate(&mut self, idx: usize) {
        self.active[idx] = false;
    }

    /// Kinetic energy summed over active particles
    pub fn kinetic_energy(&self) -> f32 {
        self.active_indices()
            .map(|i| 0.5 * self.mass[i] * self.velocity[i].length_squared())
            .sum()
    }

    /// Check the pool invariants. Only evaluated in debug builds.
    pub fn debug_validate(&self) {
        let n = self.capacity();
        debug_assert_eq!(self.position.len(), n);
        debug_assert_eq!(self.velocity.len(), n);
        debug_assert_eq!(self.acceleration.len(), n);
        debug_assert_eq!(self.prev_position.len(), n);
        debug_assert_eq!(self.mass.len(), n);
        debug_assert_eq!(self.radius.len(), n);
        debug_assert_eq!(self.age.len(), n);
        debug_assert!(
            self.active_indices().all(|i| self.mass[i] > 0.0),
            "active particle with non-positive mass"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_inactive_with_defaults() {
        let state = ParticleState::new(8);
        assert_eq!(state.capacity(), 8);
        assert_eq!(state.active_count(), 0);
        assert!(!state.any_active());
        assert!(state.mass.iter().all(|&m| m == DEFAULT_MASS));
        assert!(state.radius.iter().all(|&r| r == DEFAULT_RADIUS));
        state.debug_validate();
    }

    #[test]
    fn activate_and_deactivate_reuse_slot() {
        let mut state = ParticleState::new(4);
        state.activate(2, Vec3::new(1.0, 2.0, 3.0), Vec3::X, 0.5, 2.0);
        assert_eq!(state.active_count(), 1);
        assert_eq!(state.active_indices().collect::<Vec<_>>(), vec![2]);
        assert_eq!(state.prev_position[2], state.position[2]);
        assert_eq!(state.free_indices().collect::<Vec<_>>(), vec![0, 1, 3]);

        state.age[2] = 5.0;
        state.deactivate(2);
        assert_eq!(state.active_count(), 0);

        state.activate(2, Vec3::ZERO, Vec3::ZERO, 1.0, 1.0);
        assert_eq!(state.age[2], 0.0);
        assert_eq!(state.capacity(), 4);
    }

    #[test]
    fn kinetic_energy_ignores_inactive() {
        let mut state = ParticleState::new(3);
        state.activate(0, Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1.0, 1.0);
        state.velocity[1] = Vec3::splat(100.0);
        assert!((state.kinetic_energy() - 2.0).abs() < 1e-6);
    }
}
