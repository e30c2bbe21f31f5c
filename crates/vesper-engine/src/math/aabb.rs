//! Axis-aligned bounding boxes.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Extent given to a flat axis by [`Aabb::make_valid`].
const MIN_EXTENT: f32 = 0.0001;

/// An axis-aligned box. The default box is *invalid* (empty): its minimum is
/// `+inf` and its maximum `-inf`, so the first [`expand_point`](Aabb::expand_point)
/// or [`union_box`](Aabb::union_box) makes it exactly that point or box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::INVALID
    }
}

impl Aabb {
    /// The empty box.
    pub const INVALID: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = 0.5 * size;
        Self::new(center - half, center + half)
    }

    /// Reset to the empty box.
    pub fn make_invalid(&mut self) {
        *self = Self::INVALID;
    }

    /// Whether `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Pad zero-thickness axes so the box has a non-empty volume.
    pub fn make_valid(&mut self) {
        let size = self.max - self.min;
        for axis in 0..3 {
            if size[axis] == 0.0 {
                self.min[axis] -= MIN_EXTENT;
                self.max[axis] += MIN_EXTENT;
            }
        }
    }

    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union_box(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Replace the box by the bounds of its eight corners under `matrix`.
    ///
    /// An invalid box stays invalid.
    pub fn apply_matrix(&mut self, matrix: &Mat4) {
        if !self.is_valid() {
            return;
        }
        let (lo, hi) = (self.min, self.max);
        let mut out = Aabb::INVALID;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            out.expand_point(matrix.transform_point3(corner));
        }
        *self = out;
    }

    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invalid_until_expanded() {
        let mut b = Aabb::default();
        assert!(!b.is_valid());
        b.expand_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(b.is_valid());
        assert_eq!(b.min, b.max);
    }

    #[test]
    fn make_valid_pads_flat_axes_only() {
        let mut b = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0));
        b.make_valid();
        assert_eq!(b.min.x, -1.0);
        assert!(b.min.y < 0.0 && b.max.y > 0.0);
    }

    #[test]
    fn union_with_invalid_is_identity() {
        let mut b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        b.union_box(&Aabb::INVALID);
        assert_eq!(b, Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
    }

    #[test]
    fn apply_matrix_translates_and_rotates() {
        let mut b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        b.apply_matrix(&Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(b.center(), Vec3::new(5.0, 0.0, 0.0));

        let mut r = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        r.apply_matrix(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2));
        assert!((r.size() - Vec3::new(1.0, 2.0, 1.0)).abs().max_element() < 1e-5);
    }

    #[test]
    fn from_center_size_round_trips() {
        let b = Aabb::from_center_size(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(2.0));
        assert_eq!(b.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.size(), Vec3::splat(2.0));
    }
}
