//! Spatial and common types

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Dimensions of a voxel grid, one entry per position axis.
///
/// Axis `k` of the grid is indexed by component `k` of a particle position,
/// so a particle at `(x0, x1, x2)` lands in voxel `(round(x0), round(x1), round(x2))`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridShape(pub [usize; 3]);

impl GridShape {
    pub const fn new(d0: usize, d1: usize, d2: usize) -> Self {
        Self([d0, d1, d2])
    }

    /// A cube with `n` voxels per side
    pub const fn cubic(n: usize) -> Self {
        Self([n, n, n])
    }

    pub fn dims(&self) -> [usize; 3] {
        self.0
    }

    /// Total number of voxels
    pub fn len(&self) -> usize {
        self.0[0] * self.0[1] * self.0[2]
    }

    /// Total number of voxels, or `None` if the product overflows `usize`
    pub fn checked_len(&self) -> Option<usize> {
        self.0[0].checked_mul(self.0[1])?.checked_mul(self.0[2])
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an integer voxel coordinate lies inside the grid
    pub fn contains(&self, voxel: IVec3) -> bool {
        (0..3).all(|axis| voxel[axis] >= 0 && (voxel[axis] as usize) < self.0[axis])
    }

    /// Row-major linear index of a voxel, or `None` outside the grid
    pub fn index(&self, voxel: IVec3) -> Option<usize> {
        if !self.contains(voxel) {
            return None;
        }
        let [_, d1, d2] = self.0;
        Some((voxel.x as usize * d1 + voxel.y as usize) * d2 + voxel.z as usize)
    }

    /// Inverse of [`GridShape::index`]
    pub fn coord(&self, index: usize) -> IVec3 {
        let [_, d1, d2] = self.0;
        IVec3::new(
            (index / (d1 * d2)) as i32,
            ((index / d2) % d1) as i32,
            (index % d2) as i32,
        )
    }

    /// Grid dimensions as floats, the period of a toroidal grid
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.0[0] as f32, self.0[1] as f32, self.0[2] as f32)
    }

    /// Coordinates of the last voxel on each axis (`shape - 1`)
    pub fn max_corner(&self) -> Vec3 {
        Vec3::new(
            self.0[0].saturating_sub(1) as f32,
            self.0[1].saturating_sub(1) as f32,
            self.0[2].saturating_sub(1) as f32,
        )
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::cubic(16)
    }
}

/// Axis-aligned box in continuous grid units
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds3 {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The box spanned by voxel centers of a grid: `[0, shape - 1]` per axis
    pub fn for_grid(shape: GridShape) -> Self {
        Self {
            min: Vec3::ZERO,
            max: shape.max_corner(),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive containment test
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True when `min <= max` on every axis
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_index_roundtrip() {
        let shape = GridShape::new(4, 5, 6);
        assert_eq!(shape.len(), 120);
        let v = IVec3::new(3, 2, 5);
        let idx = shape.index(v).unwrap();
        assert_eq!(shape.coord(idx), v);
    }

    #[test]
    fn test_grid_checked_len() {
        assert_eq!(GridShape::new(4, 5, 6).checked_len(), Some(120));
        let huge = 1usize << (usize::BITS / 2);
        assert_eq!(GridShape::new(huge, huge, 2).checked_len(), None);
        assert_eq!(GridShape::cubic(16).extent(), Vec3::splat(16.0));
    }

    #[test]
    fn test_grid_contains() {
        let shape = GridShape::cubic(16);
        assert!(shape.contains(IVec3::new(0, 0, 0)));
        assert!(shape.contains(IVec3::new(15, 15, 15)));
        assert!(!shape.contains(IVec3::new(16, 0, 0)));
        assert!(!shape.contains(IVec3::new(0, -1, 0)));
        assert_eq!(shape.index(IVec3::new(0, 0, 16)), None);
    }

    #[test]
    fn test_bounds_for_grid() {
        let b = Bounds3::for_grid(GridShape::cubic(16));
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::splat(15.0));
        assert_eq!(b.size(), Vec3::splat(15.0));
        assert!(b.contains(Vec3::new(15.0, 0.0, 7.5)));
        assert!(!b.contains(Vec3::new(15.1, 0.0, 7.5)));
        assert!(b.is_valid());
    }

    #[test]
    fn test_grid_shape_deserializes_from_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            shape: GridShape,
        }
        let w: Wrapper = toml::from_str("shape = [8, 16, 32]").unwrap();
        assert_eq!(w.shape, GridShape::new(8, 16, 32));
    }
}
