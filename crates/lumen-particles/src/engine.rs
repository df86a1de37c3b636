//! Physics engine: velocity-form Verlet integration with a force/constraint
//! pipeline

use crate::constraints::{boundary_collision, boundary_wrap, Constraint};
use crate::forces::Force;
use crate::state::ParticleState;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// How the simulation domain treats its walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Reflect off the walls
    #[default]
    Bounce,
    /// Toroidal domain
    Wrap,
    /// No implicit walls
    None,
}

/// Handle returned by [`PhysicsEngine::add_force`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForceId(u64);

/// Handle returned by [`PhysicsEngine::add_constraint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(u64);

/// Owns the ordered force and constraint lists and advances a
/// [`ParticleState`] by one fixed timestep per [`step`](Self::step).
pub struct PhysicsEngine {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    /// Fixed timestep in seconds
    pub dt: f32,
    pub boundary_mode: BoundaryMode,
    forces: Vec<(ForceId, Box<dyn Force>)>,
    constraints: Vec<(ConstraintId, Box<dyn Constraint>)>,
    next_id: u64,
    /// Per-slot scratch buffers reused across steps
    net_force: Vec<Vec3>,
    scratch: Vec<Vec3>,
}

impl PhysicsEngine {
    pub fn new(bounds_min: Vec3, bounds_max: Vec3, dt: f32, boundary_mode: BoundaryMode) -> Self {
        debug_assert!(dt > 0.0, "timestep must be positive");
        log::debug!(
            "physics engine: bounds {bounds_min}..{bounds_max}, dt {dt}, boundary {boundary_mode:?}"
        );
        Self {
            bounds_min,
            bounds_max,
            dt,
            boundary_mode,
            forces: Vec::new(),
            constraints: Vec::new(),
            next_id: 0,
            net_force: Vec::new(),
            scratch: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append a force; forces are summed, so order only affects rounding.
    pub fn add_force<F: Force + 'static>(&mut self, force: F) -> ForceId {
        self.add_boxed_force(Box::new(force))
    }

    pub fn add_boxed_force(&mut self, force: Box<dyn Force>) -> ForceId {
        let id = ForceId(self.next_id());
        log::debug!("add force {} ({id:?})", force.name());
        self.forces.push((id, force));
        id
    }

    /// Remove a force, keeping the order of the others
    pub fn remove_force(&mut self, id: ForceId) -> Option<Box<dyn Force>> {
        let pos = self.forces.iter().position(|(fid, _)| *fid == id)?;
        let (_, force) = self.forces.remove(pos);
        log::debug!("remove force {} ({id:?})", force.name());
        Some(force)
    }

    /// Append a constraint. Constraints run in registration order and each
    /// sees the result of the ones before it.
    pub fn add_constraint<C: Constraint + 'static>(&mut self, constraint: C) -> ConstraintId {
        self.add_boxed_constraint(Box::new(constraint))
    }

    pub fn add_boxed_constraint(&mut self, constraint: Box<dyn Constraint>) -> ConstraintId {
        let id = ConstraintId(self.next_id());
        log::debug!("add constraint {} ({id:?})", constraint.name());
        self.constraints.push((id, constraint));
        id
    }

    /// Remove a constraint, keeping the order of the others
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Box<dyn Constraint>> {
        let pos = self.constraints.iter().position(|(cid, _)| *cid == id)?;
        let (_, constraint) = self.constraints.remove(pos);
        log::debug!("remove constraint {} ({id:?})", constraint.name());
        Some(constraint)
    }

    pub fn force_count(&self) -> usize {
        self.forces.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Names of the registered constraints in execution order
    pub fn constraint_names(&self) -> Vec<&str> {
        self.constraints.iter().map(|(_, c)| c.name()).collect()
    }

    pub fn clear_forces(&mut self) {
        self.forces.clear();
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    /// Drop every force and constraint
    pub fn reset(&mut self) {
        self.clear_forces();
        self.clear_constraints();
    }

    /// The wall constraint matching this engine's bounds and boundary mode,
    /// or `None` for [`BoundaryMode::None`].
    pub fn boundary_constraint(&self, restitution: f32) -> Option<Box<dyn Constraint>> {
        match self.boundary_mode {
            BoundaryMode::Bounce => Some(Box::new(boundary_collision(
                self.bounds_min,
                self.bounds_max,
                restitution,
            ))),
            BoundaryMode::Wrap => Some(Box::new(boundary_wrap(self.bounds_min, self.bounds_max))),
            BoundaryMode::None => None,
        }
    }

    /// Advance the simulation by one timestep.
    ///
    /// 1. no active particles: no-op
    /// 2. snapshot `prev_position`
    /// 3. sum all forces
    /// 4. `a = F / m` (non-positive mass treated as 1)
    /// 5. velocity Verlet: half kick, drift, half kick
    /// 6. constraints in registration order
    /// 7. age active particles by `dt`
    pub fn step(&mut self, state: &mut ParticleState, t: f32) {
        if !state.any_active() {
            return;
        }
        state.debug_validate();

        let n = state.capacity();
        let dt = self.dt;
        let half_dt = dt * 0.5;

        for i in 0..n {
            if state.active[i] {
                state.prev_position[i] = state.position[i];
            }
        }

        self.net_force.clear();
        self.net_force.resize(n, Vec3::ZERO);
        self.scratch.resize(n, Vec3::ZERO);
        for (_, force) in &self.forces {
            force.apply(state, t, &mut self.scratch);
            for (acc, f) in self.net_force.iter_mut().zip(&self.scratch) {
                *acc += *f;
            }
        }

        for i in 0..n {
            let mass = if state.mass[i] > 0.0 { state.mass[i] } else { 1.0 };
            state.acceleration[i] = self.net_force[i] / mass;
        }

        for i in 0..n {
            if !state.active[i] {
                continue;
            }
            let a = state.acceleration[i];
            let half_vel = state.velocity[i] + a * half_dt;
            state.position[i] += half_vel * dt;
            state.velocity[i] = half_vel + a * half_dt;
        }

        for (_, constraint) in &mut self.constraints {
            constraint.apply(state);
        }

        for i in 0..n {
            if state.active[i] {
                state.age[i] += dt;
            }
        }

        log::trace!("step t={t:.3}: {} active", state.active_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::particle_particle_collision;
    use crate::constraints::boundary_collision;
    use crate::forces::{drag, gravity};

    fn engine(dt: f32) -> PhysicsEngine {
        PhysicsEngine::new(Vec3::ZERO, Vec3::splat(15.0), dt, BoundaryMode::Bounce)
    }

    /// Records the order constraints run in via the particle's age
    struct Stamp(f32);

    impl Constraint for Stamp {
        fn apply(&mut self, state: &mut ParticleState) {
            state.age[0] = state.age[0] * 10.0 + self.0;
        }

        fn name(&self) -> &str {
            "stamp"
        }
    }

    #[test]
    fn step_without_active_particles_is_noop() {
        let mut engine = engine(0.016);
        engine.add_force(gravity(-9.8, 0));
        let mut state = ParticleState::new(3);
        state.position[1] = Vec3::splat(4.0);
        state.prev_position[1] = Vec3::splat(1.0);
        engine.step(&mut state, 0.0);
        assert_eq!(state.position[1], Vec3::splat(4.0));
        assert_eq!(state.prev_position[1], Vec3::splat(1.0));
        assert_eq!(state.age[1], 0.0);
    }

    #[test]
    fn free_fall_matches_closed_form() {
        let dt = 0.01;
        let mut engine = PhysicsEngine::new(Vec3::splat(-1e6), Vec3::splat(1e6), dt, BoundaryMode::None);
        engine.add_force(gravity(-9.8, 2));
        let mut state = ParticleState::new(1);
        let x0 = Vec3::new(1.0, 2.0, 3.0);
        let v0 = Vec3::new(0.5, -1.0, 4.0);
        state.activate(0, x0, v0, 1.0, 2.0);

        let steps = 200;
        for k in 0..steps {
            engine.step(&mut state, k as f32 * dt);
        }
        let t = steps as f32 * dt;
        let expected = x0 + v0 * t + Vec3::new(0.0, 0.0, -9.8) * (0.5 * t * t);
        assert!(
            state.position[0].abs_diff_eq(expected, 1e-3),
            "{} vs {}",
            state.position[0],
            expected
        );
        let expected_v = v0 + Vec3::new(0.0, 0.0, -9.8) * t;
        assert!(state.velocity[0].abs_diff_eq(expected_v, 1e-3));
        assert!((state.age[0] - t).abs() < 1e-4);
    }

    #[test]
    fn prev_position_is_pre_step_position() {
        let mut engine = engine(0.1);
        let mut state = ParticleState::new(1);
        state.activate(0, Vec3::splat(5.0), Vec3::new(1.0, 0.0, 0.0), 1.0, 1.0);
        engine.step(&mut state, 0.0);
        assert_eq!(state.prev_position[0], Vec3::splat(5.0));
        assert!(state.position[0].abs_diff_eq(Vec3::new(5.1, 5.0, 5.0), 1e-6));
    }

    #[test]
    fn zero_mass_does_not_produce_nan() {
        let mut engine = engine(0.016);
        engine.add_force(drag(0.5));
        let mut state = ParticleState::new(2);
        state.activate(0, Vec3::splat(5.0), Vec3::ONE, 1.0, 1.0);
        state.mass[1] = 0.0;
        engine.step(&mut state, 0.0);
        assert!(state.acceleration.iter().all(|a| a.is_finite()));
    }

    #[test]
    fn constraints_run_in_registration_order() {
        let mut engine = engine(0.016);
        engine.add_constraint(Stamp(1.0));
        let middle = engine.add_constraint(Stamp(2.0));
        engine.add_constraint(Stamp(3.0));
        let mut state = ParticleState::new(1);
        state.activate(0, Vec3::splat(5.0), Vec3::ZERO, 1.0, 1.0);
        engine.step(&mut state, 0.0);
        // ((0*10+1)*10+2)*10+3 = 123, then aged by dt
        assert!((state.age[0] - (123.0 + 0.016)).abs() < 1e-3);

        assert!(engine.remove_constraint(middle).is_some());
        assert!(engine.remove_constraint(middle).is_none());
        assert_eq!(engine.constraint_names(), vec!["stamp", "stamp"]);
        state.age[0] = 0.0;
        engine.step(&mut state, 0.016);
        assert!((state.age[0] - (13.0 + 0.016)).abs() < 1e-3);
    }

    #[test]
    fn remove_force_by_handle() {
        let mut engine = engine(0.1);
        let g = engine.add_force(gravity(-9.8, 0));
        engine.add_force(drag(0.1));
        assert_eq!(engine.force_count(), 2);
        let removed = engine.remove_force(g).unwrap();
        assert_eq!(removed.name(), "gravity");
        assert_eq!(engine.force_count(), 1);
        engine.reset();
        assert_eq!(engine.force_count(), 0);
        assert_eq!(engine.constraint_count(), 0);
    }

    #[test]
    fn boundary_constraint_follows_mode() {
        let mut e = engine(0.1);
        assert_eq!(e.boundary_constraint(0.8).unwrap().name(), "boundary_collision");
        e.boundary_mode = BoundaryMode::Wrap;
        assert_eq!(e.boundary_constraint(0.8).unwrap().name(), "boundary_wrap");
        e.boundary_mode = BoundaryMode::None;
        assert!(e.boundary_constraint(0.8).is_none());
    }

    #[test]
    fn wall_bounce_reverses_velocity() {
        let mut engine = engine(0.016);
        engine.add_constraint(boundary_collision(Vec3::ZERO, Vec3::splat(15.0), 1.0));
        let mut state = ParticleState::new(1);
        state.activate(0, Vec3::new(14.95, 7.0, 7.0), Vec3::new(10.0, 0.0, 0.0), 1.0, 1.0);
        engine.step(&mut state, 0.0);
        assert_eq!(state.position[0].x, 15.0);
        assert!((state.velocity[0].x + 10.0).abs() < 1e-5);
        for k in 1..50 {
            engine.step(&mut state, k as f32 * 0.016);
            assert!(state.position[0].cmpge(Vec3::ZERO).all());
            assert!(state.position[0].cmple(Vec3::splat(15.0)).all());
            assert!((state.velocity[0].length() - 10.0).abs() < 1e-4);
        }
    }

    #[test]
    fn bouncing_particle_stays_in_box_and_loses_energy() {
        let dt = 0.016;
        let g = -9.8;
        let mut engine = engine(dt);
        engine.add_force(gravity(g, 0));
        engine.add_force(drag(0.05));
        engine.add_constraint(boundary_collision(Vec3::ZERO, Vec3::splat(15.0), 0.8));
        let mut state = ParticleState::new(4);
        state.activate(0, Vec3::new(8.0, 8.0, 14.0), Vec3::new(0.0, 0.0, -2.0), 1.0, 1.0);

        let energy = |s: &ParticleState| s.kinetic_energy() + s.mass[0] * -g * s.position[0].x;
        let initial = energy(&state);
        let mut bounced = false;
        for k in 0..100 {
            let before = state.velocity[0].x;
            engine.step(&mut state, k as f32 * dt);
            let p = state.position[0];
            assert!(p.cmpge(Vec3::ZERO).all() && p.cmple(Vec3::splat(15.0)).all(), "step {k}: {p}");
            assert!(energy(&state) <= initial + 1e-2, "step {k}: energy grew");
            if before < 0.0 && state.velocity[0].x > 0.0 {
                bounced = true;
                // restitution 0.8 shrinks the rebound speed
                assert!(state.velocity[0].x < -before);
            }
        }
        assert!(bounced, "particle should hit the floor within 100 steps");
        assert!(energy(&state) < initial);
    }

    #[test]
    fn collision_constraint_plugs_into_step() {
        let mut engine = engine(0.01);
        engine.add_constraint(particle_particle_collision(true, 1.0, true));
        let mut state = ParticleState::new(2);
        state.activate(0, Vec3::new(5.0, 5.0, 5.0), Vec3::new(1.0, 0.0, 0.0), 0.5, 1.0);
        state.activate(1, Vec3::new(5.9, 5.0, 5.0), Vec3::new(-1.0, 0.0, 0.0), 0.5, 1.0);
        engine.step(&mut state, 0.0);
        assert!(state.velocity[0].x < 0.0 && state.velocity[1].x > 0.0);
    }
}
