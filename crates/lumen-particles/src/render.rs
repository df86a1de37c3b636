//! Voxelization: continuous particle state to a boolean occupancy grid

use crate::state::ParticleState;
use glam::{IVec3, Vec3};
use lumen_core::GridShape;
use serde::{Deserialize, Serialize};

/// Movement (in voxels) below which no motion-blur streak is drawn
const BLUR_MIN_MOVEMENT: f32 = 0.1;
/// Segments shorter than this only mark their start voxel
const LINE_MIN_LENGTH: f32 = 0.5;
/// Line samples per voxel of segment length
const LINE_OVERSAMPLE: f32 = 2.0;

/// How a particle is stamped into the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// The single nearest voxel
    Point,
    /// A filled ball of the particle's radius
    #[default]
    Sphere,
}

/// Dense boolean occupancy grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    shape: GridShape,
    cells: Vec<bool>,
}

impl VoxelGrid {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            cells: vec![false; shape.len()],
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Occupancy at `voxel`; out-of-grid coordinates read as empty
    pub fn get(&self, voxel: IVec3) -> bool {
        self.shape.index(voxel).is_some_and(|i| self.cells[i])
    }

    /// Mark a voxel. Out-of-grid coordinates are ignored; returns whether
    /// the voxel was inside the grid.
    pub fn set(&mut self, voxel: IVec3) -> bool {
        match self.shape.index(voxel) {
            Some(i) => {
                self.cells[i] = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Logical OR with another grid of the same shape
    pub fn union_with(&mut self, other: &VoxelGrid) {
        assert_eq!(self.shape, other.shape, "grid shapes differ");
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a |= b;
        }
    }

    /// Number of occupied voxels
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Coordinates of occupied voxels in row-major order
    pub fn occupied(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c)
            .map(|(i, _)| self.shape.coord(i))
    }

    /// Flat row-major view, axis 2 fastest
    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }
}

/// Whether an integer voxel coordinate lies inside `shape`
pub fn in_bounds(voxel: IVec3, shape: GridShape) -> bool {
    shape.contains(voxel)
}

/// Nearest voxel to a continuous position
fn nearest_voxel(p: Vec3) -> IVec3 {
    p.round().as_ivec3()
}

/// Mark every voxel within `radius` of `center`, scanning only the clipped
/// integer bounding box of the ball.
pub fn stamp_sphere(grid: &mut VoxelGrid, center: Vec3, radius: f32) {
    let dims = grid.shape.dims();
    let mut lo = [0i64; 3];
    let mut hi = [0i64; 3];
    for axis in 0..3 {
        lo[axis] = ((center[axis] - radius).floor() as i64).max(0);
        // inclusive upper corner, clipped to the last voxel
        hi[axis] = ((center[axis] + radius).floor() as i64).min(dims[axis] as i64 - 1);
        if lo[axis] > hi[axis] {
            return;
        }
    }

    let r2 = radius * radius;
    for x in lo[0]..=hi[0] {
        for y in lo[1]..=hi[1] {
            for z in lo[2]..=hi[2] {
                let voxel = IVec3::new(x as i32, y as i32, z as i32);
                if voxel.as_vec3().distance_squared(center) <= r2 {
                    grid.set(voxel);
                }
            }
        }
    }
}

/// Mark the voxels along the segment `p0 -> p1` by oversampled linear
/// interpolation. Samples outside the grid are skipped; only the samples
/// whose parameter falls inside the grid box are visited.
pub fn stamp_line(grid: &mut VoxelGrid, p0: Vec3, p1: Vec3) {
    let delta = p1 - p0;
    let length = delta.length();
    if length < LINE_MIN_LENGTH {
        grid.set(nearest_voxel(p0));
        return;
    }

    let samples = ((length * LINE_OVERSAMPLE).ceil() as usize).max(2);
    let last = (samples - 1) as f32;
    let Some((t0, t1)) = clip_to_grid(p0, delta, grid.shape) else {
        return;
    };
    // one sample of slack on each side absorbs rounding in the clip
    let first = ((t0 * last).floor() as usize).saturating_sub(1).min(samples - 1);
    let end = ((t1 * last).ceil() as usize).saturating_add(1).min(samples - 1);
    for k in first..=end {
        let t = k as f32 / last;
        grid.set(nearest_voxel(p0 + delta * t));
    }
}

/// Parameter range `[t0, t1]` within `[0, 1]` where `p0 + t * delta` lies in
/// the box of points that round into the grid, or `None` if it never does.
fn clip_to_grid(p0: Vec3, delta: Vec3, shape: GridShape) -> Option<(f32, f32)> {
    let lo = Vec3::splat(-0.5);
    let hi = shape.extent() - 0.5;
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for axis in 0..3 {
        let (p, d) = (p0[axis], delta[axis]);
        if d == 0.0 {
            if p < lo[axis] || p > hi[axis] {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo[axis] - p) / d, (hi[axis] - p) / d);
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }
    (t0 <= t1).then_some((t0, t1))
}

/// A fresh grid containing only the ball at `center`
pub fn draw_sphere(center: Vec3, radius: f32, shape: GridShape) -> VoxelGrid {
    let mut grid = VoxelGrid::new(shape);
    stamp_sphere(&mut grid, center, radius);
    grid
}

/// A fresh grid containing only the segment `p0 -> p1`
pub fn draw_line_3d(p0: Vec3, p1: Vec3, shape: GridShape) -> VoxelGrid {
    let mut grid = VoxelGrid::new(shape);
    stamp_line(&mut grid, p0, p1);
    grid
}

/// Rasterize every active particle into a new occupancy grid.
///
/// With `motion_blur`, particles that moved more than a tenth of a voxel
/// since the last step also get a streak from `prev_position`.
pub fn particles_to_voxels(
    state: &ParticleState,
    shape: GridShape,
    mode: RenderMode,
    motion_blur: bool,
) -> VoxelGrid {
    let mut grid = VoxelGrid::new(shape);
    render_into(&mut grid, state, mode, motion_blur);
    grid
}

/// [`particles_to_voxels`] into an existing grid, which is cleared first
pub fn render_into(grid: &mut VoxelGrid, state: &ParticleState, mode: RenderMode, motion_blur: bool) {
    grid.clear();
    for i in state.active_indices() {
        let pos = state.position[i];
        match mode {
            RenderMode::Sphere => stamp_sphere(grid, pos, state.radius[i]),
            RenderMode::Point => {
                grid.set(nearest_voxel(pos));
            }
        }

        if motion_blur {
            let prev = state.prev_position[i];
            if pos.distance(prev) > BLUR_MIN_MOVEMENT {
                stamp_line(grid, prev, pos);
            }
        }
    }
}
