//! Constraint functions: post-integration state corrections
//!
//! Constraints run after the Verlet update in registration order and see the
//! already-advanced positions and velocities. They may move particles and
//! change velocities or ages but never resize the pool or reorder slots.

use crate::state::ParticleState;
use glam::Vec3;

/// A rule enforced on the particle pool after each integration step.
pub trait Constraint {
    fn apply(&mut self, state: &mut ParticleState);

    /// Human-readable name, used in logs
    fn name(&self) -> &str;
}

/// Walls at `min`/`max` that clamp position and reflect the crossing
/// velocity component scaled by `restitution`.
#[derive(Debug, Clone)]
pub struct BoundaryCollision {
    pub min: Vec3,
    pub max: Vec3,
    pub restitution: f32,
}

pub fn boundary_collision(min: Vec3, max: Vec3, restitution: f32) -> BoundaryCollision {
    BoundaryCollision {
        min,
        max,
        restitution,
    }
}

impl Constraint for BoundaryCollision {
    fn apply(&mut self, state: &mut ParticleState) {
        for i in 0..state.capacity() {
            if !state.active[i] {
                continue;
            }
            let p = &mut state.position[i];
            let v = &mut state.velocity[i];
            for axis in 0..3 {
                if p[axis] < self.min[axis] {
                    p[axis] = self.min[axis];
                    v[axis] *= -self.restitution;
                } else if p[axis] > self.max[axis] {
                    p[axis] = self.max[axis];
                    v[axis] *= -self.restitution;
                }
            }
        }
    }

    fn name(&self) -> &str {
        "boundary_collision"
    }
}

/// Toroidal domain: leaving through one face re-enters through the opposite
/// face. Velocity is untouched.
#[derive(Debug, Clone)]
pub struct BoundaryWrap {
    pub min: Vec3,
    pub max: Vec3,
}

pub fn boundary_wrap(min: Vec3, max: Vec3) -> BoundaryWrap {
    BoundaryWrap { min, max }
}

impl Constraint for BoundaryWrap {
    fn apply(&mut self, state: &mut ParticleState) {
        let size = self.max - self.min;
        for i in 0..state.capacity() {
            if !state.active[i] {
                continue;
            }
            let p = &mut state.position[i];
            for axis in 0..3 {
                if p[axis] < self.min[axis] {
                    p[axis] += size[axis];
                } else if p[axis] > self.max[axis] {
                    p[axis] -= size[axis];
                }
            }
        }
    }

    fn name(&self) -> &str {
        "boundary_wrap"
    }
}

/// Spherical wall. With `inside` the sphere is a container; otherwise it is a
/// solid obstacle. Violating particles are projected onto the surface and
/// their velocity is mirrored about the surface normal:
/// `v' = (v - 2 (v . n) n) * restitution`.
#[derive(Debug, Clone)]
pub struct SphereCollision {
    pub center: Vec3,
    pub radius: f32,
    pub restitution: f32,
    pub inside: bool,
}

pub fn sphere_collision(center: Vec3, radius: f32, restitution: f32, inside: bool) -> SphereCollision {
    SphereCollision {
        center,
        radius,
        restitution,
        inside,
    }
}

impl Constraint for SphereCollision {
    fn apply(&mut self, state: &mut ParticleState) {
        for i in 0..state.capacity() {
            if !state.active[i] {
                continue;
            }
            let r = state.position[i] - self.center;
            let dist = r.length();
            let violates = if self.inside {
                dist > self.radius
            } else {
                dist < self.radius
            };
            // A particle exactly at the center has no defined normal
            if !violates || dist <= f32::EPSILON {
                continue;
            }
            let n = r / dist;
            state.position[i] = self.center + n * self.radius;
            let v = state.velocity[i];
            state.velocity[i] = (v - 2.0 * v.dot(n) * n) * self.restitution;
        }
    }

    fn name(&self) -> &str {
        "sphere_collision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(position: Vec3, velocity: Vec3) -> ParticleState {
        let mut state = ParticleState::new(1);
        state.activate(0, position, velocity, 0.5, 1.0);
        state
    }

    #[test]
    fn boundary_bounce_clamps_and_reflects() {
        let mut state = one(Vec3::new(15.3, -0.2, 7.0), Vec3::new(10.0, -4.0, 1.0));
        boundary_collision(Vec3::ZERO, Vec3::splat(15.0), 1.0).apply(&mut state);
        assert_eq!(state.position[0], Vec3::new(15.0, 0.0, 7.0));
        assert!(state.velocity[0].abs_diff_eq(Vec3::new(-10.0, 4.0, 1.0), 1e-6));
    }

    #[test]
    fn boundary_bounce_applies_restitution() {
        let mut state = one(Vec3::new(-1.0, 5.0, 5.0), Vec3::new(-5.0, 0.0, 0.0));
        boundary_collision(Vec3::ZERO, Vec3::splat(15.0), 0.8).apply(&mut state);
        assert!((state.velocity[0].x - 4.0).abs() < 1e-6);
    }

    #[test]
    fn boundary_ignores_inactive() {
        let mut state = ParticleState::new(1);
        state.position[0] = Vec3::splat(-50.0);
        boundary_collision(Vec3::ZERO, Vec3::splat(15.0), 1.0).apply(&mut state);
        assert_eq!(state.position[0], Vec3::splat(-50.0));
    }

    #[test]
    fn wrap_shifts_by_domain_size() {
        let mut state = one(Vec3::new(15.5, -0.5, 3.0), Vec3::new(2.0, -1.0, 0.0));
        boundary_wrap(Vec3::ZERO, Vec3::splat(15.0)).apply(&mut state);
        assert!(state.position[0].abs_diff_eq(Vec3::new(0.5, 14.5, 3.0), 1e-5));
        assert_eq!(state.velocity[0], Vec3::new(2.0, -1.0, 0.0));
    }

    #[test]
    fn sphere_container_projects_and_reflects() {
        let mut state = one(Vec3::new(10.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 0.0));
        sphere_collision(Vec3::ZERO, 7.0, 1.0, true).apply(&mut state);
        assert!(state.position[0].abs_diff_eq(Vec3::new(7.0, 0.0, 0.0), 1e-5));
        assert!(state.velocity[0].abs_diff_eq(Vec3::new(-3.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn solid_sphere_pushes_out() {
        let mut state = one(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -2.0, 0.0));
        sphere_collision(Vec3::ZERO, 3.0, 0.5, false).apply(&mut state);
        assert!(state.position[0].abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-5));
        assert!(state.velocity[0].abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn solid_sphere_skips_particle_at_center() {
        let mut state = one(Vec3::ZERO, Vec3::X);
        sphere_collision(Vec3::ZERO, 3.0, 0.5, false).apply(&mut state);
        assert_eq!(state.position[0], Vec3::ZERO);
        assert_eq!(state.velocity[0], Vec3::X);
    }
}
