//! Seedable particle RNG with the sampling helpers emitters and forces need

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Thin wrapper over a seeded `StdRng`.
///
/// Every emitter and turbulent force owns one, so a simulation built from a
/// fixed seed replays identically.
pub struct ParticleRng {
    inner: StdRng,
}

impl ParticleRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns a float in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Returns a float in [min, max)
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Standard normal sample (Box-Muller)
    pub fn gaussian(&mut self) -> f32 {
        // 1 - u keeps the log argument in (0, 1]
        let u1 = 1.0 - self.next_f32();
        let u2 = self.next_f32();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    /// Three independent standard normal samples
    pub fn gaussian_vec3(&mut self) -> Vec3 {
        Vec3::new(self.gaussian(), self.gaussian(), self.gaussian())
    }

    /// Uniform point inside the box `[min, max)`
    pub fn point_in_box(&mut self, min: Vec3, max: Vec3) -> Vec3 {
        Vec3::new(
            self.range(min.x, max.x),
            self.range(min.y, max.y),
            self.range(min.z, max.z),
        )
    }

    /// Returns a unit direction within a cone around `direction`.
    ///
    /// The polar angle is drawn uniformly from `[0, half_angle)` (radians) and
    /// the azimuth from `[0, 2pi)` in a frame whose pole is +Z; the sample is
    /// then rotated onto `direction`, which must be unit length.
    pub fn cone_direction(&mut self, direction: Vec3, half_angle: f32) -> Vec3 {
        let theta = self.range(0.0, half_angle);
        let phi = self.range(0.0, TAU);
        let local = Vec3::new(
            theta.sin() * phi.cos(),
            theta.sin() * phi.sin(),
            theta.cos(),
        );
        rotate_from_z(direction, local)
    }
}

/// Rotates `v` by the rotation that carries +Z onto the unit vector `direction`
/// (Rodrigues' formula about `Z x direction`).
pub fn rotate_from_z(direction: Vec3, v: Vec3) -> Vec3 {
    if direction.abs_diff_eq(Vec3::Z, 1e-6) {
        return v;
    }
    let axis = Vec3::Z.cross(direction);
    let axis_len = axis.length();
    if axis_len < 1e-6 {
        // direction is -Z
        return -v;
    }
    let axis = axis / axis_len;
    let angle = Vec3::Z.dot(direction).clamp(-1.0, 1.0).acos();
    let (sin, cos) = angle.sin_cos();
    v * cos + axis.cross(v) * sin + axis * axis.dot(v) * (1.0 - cos)
}
