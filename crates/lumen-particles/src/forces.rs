//! Force functions: per-particle force contributions from state and time
//!
//! Each force writes one vector per pool slot and leaves inactive slots at
//! zero. The engine sums every registered force into its accumulator before
//! integrating.

use crate::rng::ParticleRng;
use crate::state::ParticleState;
use glam::Vec3;

/// A force field evaluated once per step.
pub trait Force {
    /// Overwrite `out` (one entry per pool slot) with this force's
    /// contribution at time `t`. Inactive slots must receive `Vec3::ZERO`.
    fn apply(&self, state: &ParticleState, t: f32, out: &mut [Vec3]);

    /// Human-readable name, used in logs
    fn name(&self) -> &str;

    /// Allocate and return the per-slot force array
    fn forces(&self, state: &ParticleState, t: f32) -> Vec<Vec3> {
        let mut out = vec![Vec3::ZERO; state.capacity()];
        self.apply(state, t, &mut out);
        out
    }
}

/// Uniform gravity along one axis: `F = m * g`
#[derive(Debug, Clone)]
pub struct Gravity {
    pub g: f32,
    pub axis: usize,
}

impl Gravity {
    pub fn new(g: f32, axis: usize) -> Self {
        debug_assert!(axis < 3, "gravity axis must be 0, 1 or 2");
        Self { g, axis }
    }
}

/// Gravity of `g` along `axis` (0, 1 or 2)
pub fn gravity(g: f32, axis: usize) -> Gravity {
    Gravity::new(g, axis)
}

impl Force for Gravity {
    fn apply(&self, state: &ParticleState, _t: f32, out: &mut [Vec3]) {
        for (i, f) in out.iter_mut().enumerate() {
            *f = Vec3::ZERO;
            if state.active[i] {
                f[self.axis] = state.mass[i] * self.g;
            }
        }
    }

    fn name(&self) -> &str {
        "gravity"
    }
}

/// Linear drag: `F = -k * v`
#[derive(Debug, Clone)]
pub struct Drag {
    pub coefficient: f32,
}

pub fn drag(coefficient: f32) -> Drag {
    Drag { coefficient }
}

impl Force for Drag {
    fn apply(&self, state: &ParticleState, _t: f32, out: &mut [Vec3]) {
        for (i, f) in out.iter_mut().enumerate() {
            *f = if state.active[i] {
                -self.coefficient * state.velocity[i]
            } else {
                Vec3::ZERO
            };
        }
    }

    fn name(&self) -> &str {
        "drag"
    }
}

/// Directional wind with optional per-particle turbulence.
///
/// Turbulence noise is reseeded from `floor(t * 10)`, so the gust pattern
/// changes ten times per simulated second and is reproducible for a given `t`.
#[derive(Debug, Clone)]
pub struct Wind {
    direction: Vec3,
    pub strength: f32,
    pub turbulence: f32,
    seed: u64,
}

impl Wind {
    /// `direction` must be non-zero; it is normalized here once.
    pub fn new(direction: Vec3, strength: f32, turbulence: f32) -> Self {
        debug_assert!(direction.length_squared() > 0.0, "wind direction must be non-zero");
        Self {
            direction: direction.normalize_or_zero(),
            strength,
            turbulence,
            seed: 0,
        }
    }

    /// Offset the turbulence seed so several wind fields decorrelate
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}

pub fn wind(direction: Vec3, strength: f32, turbulence: f32) -> Wind {
    Wind::new(direction, strength, turbulence)
}

impl Force for Wind {
    fn apply(&self, state: &ParticleState, t: f32, out: &mut [Vec3]) {
        let base = self.direction * self.strength;
        out.fill(base);

        if self.turbulence > 0.0 {
            let quantum = (t * 10.0).floor() as i64;
            let mut rng = ParticleRng::new(self.seed.wrapping_add(quantum as u64));
            let scale = self.turbulence * self.strength;
            // Noise is drawn for every slot so a particle's gust does not
            // depend on which other slots happen to be active.
            for f in out.iter_mut() {
                *f += rng.gaussian_vec3() * scale;
            }
        }

        for (f, &active) in out.iter_mut().zip(state.active.iter()) {
            if !active {
                *f = Vec3::ZERO;
            }
        }
    }

    fn name(&self) -> &str {
        "wind"
    }
}

/// Inverse-square point attractor: `|F| = strength * m / max(r, min_distance)^2`
#[derive(Debug, Clone)]
pub struct GravityWell {
    pub center: Vec3,
    pub strength: f32,
    pub min_distance: f32,
}

pub fn gravity_well(center: Vec3, strength: f32, min_distance: f32) -> GravityWell {
    GravityWell {
        center,
        strength,
        min_distance,
    }
}

impl Force for GravityWell {
    fn apply(&self, state: &ParticleState, _t: f32, out: &mut [Vec3]) {
        let floor = self.min_distance.max(f32::EPSILON);
        for (i, f) in out.iter_mut().enumerate() {
            *f = Vec3::ZERO;
            if !state.active[i] {
                continue;
            }
            let r = self.center - state.position[i];
            let dist = r.length().max(floor);
            let magnitude = self.strength * state.mass[i] / (dist * dist);
            *f = r / dist * magnitude;
        }
    }

    fn name(&self) -> &str {
        "gravity_well"
    }
}

/// Damped Hooke spring to one anchor per slot:
/// `F = -k * (x - anchor) - c * v`
///
/// Slots past the end of `anchors` feel no spring.
#[derive(Debug, Clone)]
pub struct Spring {
    pub anchors: Vec<Vec3>,
    pub stiffness: f32,
    pub damping: f32,
}

pub fn spring(anchors: Vec<Vec3>, stiffness: f32, damping: f32) -> Spring {
    Spring {
        anchors,
        stiffness,
        damping,
    }
}

impl Force for Spring {
    fn apply(&self, state: &ParticleState, _t: f32, out: &mut [Vec3]) {
        for (i, f) in out.iter_mut().enumerate() {
            *f = match self.anchors.get(i) {
                Some(&anchor) if state.active[i] => {
                    -self.stiffness * (state.position[i] - anchor)
                        - self.damping * state.velocity[i]
                }
                _ => Vec3::ZERO,
            };
        }
    }

    fn name(&self) -> &str {
        "spring"
    }
}

/// Minimum distance from the vortex axis used when normalizing the radial pull
const VORTEX_CORE: f32 = 0.1;
/// Inward pull relative to the swirl strength
const VORTEX_INWARD: f32 = 0.3;

/// Tornado-like swirl about an axis, fading as `exp(-d / radius)` with the
/// distance `d` from the axis, plus a weaker pull toward the axis.
#[derive(Debug, Clone)]
pub struct Vortex {
    pub center: Vec3,
    axis: Vec3,
    pub strength: f32,
    pub radius: f32,
}

impl Vortex {
    /// `axis` must be non-zero and `radius` positive.
    pub fn new(center: Vec3, axis: Vec3, strength: f32, radius: f32) -> Self {
        debug_assert!(axis.length_squared() > 0.0, "vortex axis must be non-zero");
        debug_assert!(radius > 0.0, "vortex radius must be positive");
        Self {
            center,
            axis: axis.normalize_or_zero(),
            strength,
            radius,
        }
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }
}

pub fn vortex(center: Vec3, axis: Vec3, strength: f32, radius: f32) -> Vortex {
    Vortex::new(center, axis, strength, radius)
}

impl Force for Vortex {
    fn apply(&self, state: &ParticleState, _t: f32, out: &mut [Vec3]) {
        for (i, f) in out.iter_mut().enumerate() {
            *f = Vec3::ZERO;
            if !state.active[i] {
                continue;
            }
            let r = state.position[i] - self.center;
            let perp = r - self.axis * r.dot(self.axis);
            let perp_dist = perp.length().max(VORTEX_CORE);
            let falloff = (-perp_dist / self.radius).exp();

            let swirl = self.axis.cross(perp) * (self.strength * falloff);
            let inward = perp / perp_dist * (VORTEX_INWARD * self.strength * falloff);
            *f = swirl - inward;
        }
    }

    fn name(&self) -> &str {
        "vortex"
    }
}
