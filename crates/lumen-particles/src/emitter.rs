//! Emitters (point/cone and volume) and lifecycle despawn helpers

use crate::rng::ParticleRng;
use crate::state::{ParticleState, DEFAULT_MASS, DEFAULT_RADIUS};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A stateful spawner that injects particles into free pool slots.
pub trait Emitter {
    /// Spawn the particles owed for a frame of length `dt`.
    /// Returns how many slots were (re)activated.
    fn emit(&mut self, state: &mut ParticleState, t: f32, dt: f32) -> usize;

    /// Age after which spawned particles should be despawned
    fn particle_lifetime(&self) -> f32;

    fn name(&self) -> &str;
}

/// Configuration for a [`ParticleEmitter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleEmitterConfig {
    pub position: Vec3,
    /// Particles per second
    pub rate: f32,
    pub velocity_min: f32,
    pub velocity_max: f32,
    /// Cone axis; normalized on construction and must be non-zero
    pub direction: Vec3,
    /// Cone half-angle in degrees
    pub spread_angle: f32,
    pub particle_lifetime: f32,
    pub particle_radius: f32,
    pub particle_mass: f32,
}

impl Default for ParticleEmitterConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rate: 10.0,
            velocity_min: 3.0,
            velocity_max: 8.0,
            direction: Vec3::Z,
            spread_angle: 15.0,
            particle_lifetime: 10.0,
            particle_radius: DEFAULT_RADIUS,
            particle_mass: DEFAULT_MASS,
        }
    }
}

/// Configuration for a [`VolumeEmitter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeEmitterConfig {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    /// Particles per second
    pub rate: f32,
    pub velocity_mean: Vec3,
    /// Scale of the per-axis gaussian added to `velocity_mean`
    pub velocity_variance: f32,
    pub particle_lifetime: f32,
    pub particle_radius: f32,
    pub particle_mass: f32,
}

impl Default for VolumeEmitterConfig {
    fn default() -> Self {
        Self {
            bounds_min: Vec3::new(0.0, 0.0, 15.0),
            bounds_max: Vec3::new(16.0, 16.0, 16.0),
            rate: 20.0,
            velocity_mean: Vec3::new(0.0, 0.0, -2.0),
            velocity_variance: 1.0,
            particle_lifetime: 10.0,
            particle_radius: DEFAULT_RADIUS,
            particle_mass: DEFAULT_MASS,
        }
    }
}

/// Fractional emission accumulator shared by both emitters.
/// Whole particles are released; the remainder carries to the next frame.
#[derive(Debug, Clone, Default)]
struct EmitAccumulator(f32);

impl EmitAccumulator {
    fn take(&mut self, rate: f32, dt: f32) -> usize {
        self.0 += rate * dt;
        let count = self.0.max(0.0).floor();
        self.0 -= count;
        count as usize
    }
}

/// Choose up to `wanted` slots to spawn into.
///
/// Free slots are used in ascending index order. Only when no slot is free
/// are active slots recycled, oldest first, breaking age ties by the lowest
/// index.
fn spawn_slots(state: &ParticleState, wanted: usize) -> Vec<usize> {
    let free: Vec<usize> = state.free_indices().take(wanted).collect();
    if !free.is_empty() {
        if free.len() < wanted {
            log::debug!("pool nearly full: emitting {} of {wanted}", free.len());
        }
        return free;
    }

    let mut by_age: Vec<usize> = (0..state.capacity()).collect();
    by_age.sort_by(|&a, &b| state.age[b].total_cmp(&state.age[a]).then(a.cmp(&b)));
    by_age.truncate(wanted);
    log::debug!("pool full: recycling {} oldest particle(s)", by_age.len());
    by_age
}

/// Point emitter spraying particles into a cone (fountains, jets).
pub struct ParticleEmitter {
    pub position: Vec3,
    pub rate: f32,
    pub velocity_min: f32,
    pub velocity_max: f32,
    direction: Vec3,
    /// Cone half-angle in radians
    pub spread_angle: f32,
    pub particle_lifetime: f32,
    pub particle_radius: f32,
    pub particle_mass: f32,
    accumulator: EmitAccumulator,
    rng: ParticleRng,
}

impl ParticleEmitter {
    pub fn new(config: &ParticleEmitterConfig, seed: u64) -> Self {
        let mut emitter = Self {
            position: config.position,
            rate: config.rate,
            velocity_min: config.velocity_min,
            velocity_max: config.velocity_max,
            direction: Vec3::Z,
            spread_angle: config.spread_angle.to_radians(),
            particle_lifetime: config.particle_lifetime,
            particle_radius: config.particle_radius,
            particle_mass: config.particle_mass,
            accumulator: EmitAccumulator::default(),
            rng: ParticleRng::new(seed),
        };
        emitter.set_direction(config.direction);
        emitter
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Set the cone axis. `direction` must be non-zero.
    pub fn set_direction(&mut self, direction: Vec3) {
        debug_assert!(direction.length_squared() > 0.0, "emitter direction must be non-zero");
        self.direction = direction.try_normalize().unwrap_or(Vec3::Z);
    }
}

impl Emitter for ParticleEmitter {
    fn emit(&mut self, state: &mut ParticleState, _t: f32, dt: f32) -> usize {
        let wanted = self.accumulator.take(self.rate, dt);
        if wanted == 0 {
            return 0;
        }
        let slots = spawn_slots(state, wanted);
        for &idx in &slots {
            let speed = self.rng.range(self.velocity_min, self.velocity_max);
            let dir = self.rng.cone_direction(self.direction, self.spread_angle);
            state.activate(
                idx,
                self.position,
                dir * speed,
                self.particle_radius,
                self.particle_mass,
            );
        }
        slots.len()
    }

    fn particle_lifetime(&self) -> f32 {
        self.particle_lifetime
    }

    fn name(&self) -> &str {
        "point"
    }
}

/// Spawns particles uniformly inside a box (rain, fog).
pub struct VolumeEmitter {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub rate: f32,
    pub velocity_mean: Vec3,
    pub velocity_variance: f32,
    pub particle_lifetime: f32,
    pub particle_radius: f32,
    pub particle_mass: f32,
    accumulator: EmitAccumulator,
    rng: ParticleRng,
}

impl VolumeEmitter {
    pub fn new(config: &VolumeEmitterConfig, seed: u64) -> Self {
        Self {
            bounds_min: config.bounds_min,
            bounds_max: config.bounds_max,
            rate: config.rate,
            velocity_mean: config.velocity_mean,
            velocity_variance: config.velocity_variance,
            particle_lifetime: config.particle_lifetime,
            particle_radius: config.particle_radius,
            particle_mass: config.particle_mass,
            accumulator: EmitAccumulator::default(),
            rng: ParticleRng::new(seed),
        }
    }
}

impl Emitter for VolumeEmitter {
    fn emit(&mut self, state: &mut ParticleState, _t: f32, dt: f32) -> usize {
        let wanted = self.accumulator.take(self.rate, dt);
        if wanted == 0 {
            return 0;
        }
        let slots = spawn_slots(state, wanted);
        for &idx in &slots {
            let position = self.rng.point_in_box(self.bounds_min, self.bounds_max);
            let velocity = self.velocity_mean + self.rng.gaussian_vec3() * self.velocity_variance;
            state.activate(
                idx,
                position,
                velocity,
                self.particle_radius,
                self.particle_mass,
            );
        }
        slots.len()
    }

    fn particle_lifetime(&self) -> f32 {
        self.particle_lifetime
    }

    fn name(&self) -> &str {
        "volume"
    }
}

/// Deactivate particles older than `max_lifetime`. Returns how many died.
pub fn despawn_old_particles(state: &mut ParticleState, max_lifetime: f32) -> usize {
    let mut count = 0;
    for i in 0..state.capacity() {
        if state.active[i] && state.age[i] > max_lifetime {
            state.deactivate(i);
            count += 1;
        }
    }
    count
}

/// Deactivate particles outside `[min, max]` on any axis. Returns how many died.
pub fn despawn_out_of_bounds(state: &mut ParticleState, min: Vec3, max: Vec3) -> usize {
    let mut count = 0;
    for i in 0..state.capacity() {
        let p = state.position[i];
        if state.active[i] && (p.cmplt(min).any() || p.cmpgt(max).any()) {
            state.deactivate(i);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fountain(rate: f32) -> ParticleEmitter {
        let config = ParticleEmitterConfig {
            position: Vec3::new(8.0, 8.0, 0.0),
            rate,
            velocity_min: 5.0,
            velocity_max: 8.0,
            direction: Vec3::new(0.0, 0.0, 3.0),
            spread_angle: 20.0,
            ..Default::default()
        };
        ParticleEmitter::new(&config, 42)
    }

    #[test]
    fn default_configs_are_sane() {
        let p = ParticleEmitterConfig::default();
        assert!(p.rate > 0.0 && p.velocity_max >= p.velocity_min);
        assert_eq!(p.direction, Vec3::Z);
        let v = VolumeEmitterConfig::default();
        assert!(v.bounds_min.cmple(v.bounds_max).all());
    }

    #[test]
    fn accumulator_carries_fraction() {
        let mut state = ParticleState::new(100);
        let mut e = fountain(1.0);
        let dt = 0.25;
        let counts: Vec<usize> = (0..8).map(|k| e.emit(&mut state, k as f32 * dt, dt)).collect();
        // a quarter particle per frame: one particle every fourth frame
        assert_eq!(counts, vec![0, 0, 0, 1, 0, 0, 0, 1]);
        assert_eq!(state.active_count(), 2);
    }

    #[test]
    fn spawned_particles_start_at_emitter_inside_cone() {
        let mut state = ParticleState::new(64);
        let mut e = fountain(60.0);
        let n = e.emit(&mut state, 0.0, 1.0);
        assert_eq!(n, 60);
        let half_angle = 20f32.to_radians();
        for i in state.active_indices() {
            assert_eq!(state.position[i], Vec3::new(8.0, 8.0, 0.0));
            assert_eq!(state.prev_position[i], state.position[i]);
            assert_eq!(state.age[i], 0.0);
            assert!(state.mass[i] > 0.0);
            let v = state.velocity[i];
            let speed = v.length();
            assert!((5.0 - 1e-4..8.0 + 1e-4).contains(&speed), "speed {speed}");
            let angle = (v / speed).dot(Vec3::Z).clamp(-1.0, 1.0).acos();
            assert!(angle <= half_angle + 1e-3);
        }
    }

    #[test]
    fn downward_emitter_uses_negation() {
        let config = ParticleEmitterConfig {
            direction: Vec3::NEG_Z,
            spread_angle: 0.0,
            velocity_min: 2.0,
            velocity_max: 2.0,
            rate: 1.0,
            ..Default::default()
        };
        let mut e = ParticleEmitter::new(&config, 1);
        let mut state = ParticleState::new(1);
        e.emit(&mut state, 0.0, 1.0);
        assert!(state.velocity[0].abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn emitting_never_exceeds_capacity() {
        let mut state = ParticleState::new(5);
        let mut e = fountain(100.0);
        let n = e.emit(&mut state, 0.0, 0.1);
        assert_eq!(n, 5);
        assert_eq!(state.active_count(), 5);
        let n = e.emit(&mut state, 0.1, 0.1);
        assert!(n <= 5);
        assert_eq!(state.active_count(), 5);
        assert_eq!(state.capacity(), 5);
    }

    #[test]
    fn partial_free_slots_emit_fewer() {
        let mut state = ParticleState::new(4);
        for i in 0..3 {
            state.activate(i, Vec3::ZERO, Vec3::ZERO, 1.0, 1.0);
        }
        let mut e = fountain(10.0);
        assert_eq!(e.emit(&mut state, 0.0, 0.3), 1);
        assert_eq!(state.active_count(), 4);
    }

    #[test]
    fn full_pool_recycles_oldest_lowest_index_first() {
        let mut state = ParticleState::new(5);
        for i in 0..5 {
            state.activate(i, Vec3::splat(1.0), Vec3::ZERO, 1.0, 1.0);
        }
        state.age.copy_from_slice(&[1.0, 4.0, 2.0, 4.0, 3.0]);
        let mut e = fountain(2.0);
        assert_eq!(e.emit(&mut state, 0.0, 1.0), 2);
        // slots 1 and 3 were the oldest (tie broken by index)
        assert_eq!(state.age[1], 0.0);
        assert_eq!(state.age[3], 0.0);
        assert_eq!(state.position[1], Vec3::new(8.0, 8.0, 0.0));
        assert_eq!(state.age[4], 3.0);

        let mut e = fountain(1.0);
        e.emit(&mut state, 1.0, 1.0);
        assert_eq!(state.age[4], 0.0, "next oldest is slot 4");
    }

    #[test]
    fn volume_emitter_spawns_inside_box() {
        let config = VolumeEmitterConfig {
            bounds_min: Vec3::new(0.0, 0.0, 15.0),
            bounds_max: Vec3::new(16.0, 16.0, 16.0),
            rate: 25.0,
            velocity_mean: Vec3::new(0.0, 0.0, -3.0),
            velocity_variance: 0.0,
            ..Default::default()
        };
        let mut e = VolumeEmitter::new(&config, 9);
        let mut state = ParticleState::new(50);
        assert_eq!(e.emit(&mut state, 0.0, 1.0), 25);
        for i in state.active_indices() {
            let p = state.position[i];
            assert!(p.cmpge(config.bounds_min).all() && p.cmple(config.bounds_max).all());
            assert_eq!(state.velocity[i], Vec3::new(0.0, 0.0, -3.0));
        }
    }

    #[test]
    fn volume_emitter_variance_spreads_velocity() {
        let config = VolumeEmitterConfig {
            rate: 40.0,
            velocity_variance: 1.0,
            ..Default::default()
        };
        let mut e = VolumeEmitter::new(&config, 11);
        let mut state = ParticleState::new(40);
        e.emit(&mut state, 0.0, 1.0);
        let distinct = state
            .active_indices()
            .filter(|&i| state.velocity[i] != config.velocity_mean)
            .count();
        assert_eq!(distinct, 40);
    }

    #[test]
    fn emitters_are_deterministic_per_seed() {
        let run = || {
            let mut state = ParticleState::new(10);
            let mut e = fountain(10.0);
            e.emit(&mut state, 0.0, 1.0);
            state.velocity.to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn despawn_by_age() {
        let mut state = ParticleState::new(3);
        for i in 0..3 {
            state.activate(i, Vec3::ZERO, Vec3::ZERO, 1.0, 1.0);
        }
        state.age.copy_from_slice(&[1.0, 10.0, 10.5]);
        assert_eq!(despawn_old_particles(&mut state, 10.0), 1);
        assert_eq!(state.active.to_vec(), vec![true, true, false]);
    }

    #[test]
    fn despawn_outside_box() {
        let mut state = ParticleState::new(3);
        state.activate(0, Vec3::splat(5.0), Vec3::ZERO, 1.0, 1.0);
        state.activate(1, Vec3::new(5.0, -0.1, 5.0), Vec3::ZERO, 1.0, 1.0);
        state.activate(2, Vec3::new(5.0, 5.0, 16.1), Vec3::ZERO, 1.0, 1.0);
        let n = despawn_out_of_bounds(&mut state, Vec3::ZERO, Vec3::splat(16.0));
        assert_eq!(n, 2);
        assert_eq!(state.active_indices().collect::<Vec<_>>(), vec![0]);
    }
}
