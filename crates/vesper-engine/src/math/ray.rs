//! Segment rays for picking.
//!
//! A [`Ray`] runs from `start` to `end`; hit distances are expressed as the
//! segment parameter `t` (0 at `start`, 1 at `end`). Every successful test
//! shrinks `dist` to the hit parameter, so testing many primitives in a row
//! keeps the closest hit.

use glam::{Mat4, Vec3};

use super::aabb::Aabb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub start: Vec3,
    pub end: Vec3,
    /// Parameter of the closest hit so far; `1.0` means nothing was hit.
    pub dist: f32,
}

impl Ray {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self {
            start,
            end,
            dist: 1.0,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    /// World position of the current hit parameter.
    pub fn hit_point(&self) -> Vec3 {
        self.start + self.dist * self.direction()
    }

    /// The same ray with both endpoints transformed by `matrix`.
    ///
    /// `dist` is preserved because the segment parameter is affine-invariant.
    pub fn inverse(&self, matrix: &Mat4) -> Ray {
        Ray {
            start: matrix.transform_point3(self.start),
            end: matrix.transform_point3(self.end),
            dist: self.dist,
        }
    }

    pub fn copy_dist(&mut self, other: &Ray) {
        self.dist = other.dist;
    }

    /// Slab test against `aabb`.
    ///
    /// Misses when the slabs do not overlap, when the entry point is at or
    /// behind `start` (a ray starting inside the box does not hit it), or
    /// when the entry is not closer than the current `dist`.
    pub fn intersects_aabb(&mut self, aabb: &Aabb) -> bool {
        let inv_d = Vec3::ONE / self.direction();
        let t0 = (aabb.min - self.start) * inv_d;
        let t1 = (aabb.max - self.start) * inv_d;

        let t_min = t0.min(t1).max_element().max(-f32::MAX);
        let t_max = t0.max(t1).min_element().min(f32::MAX);

        if t_min >= t_max || t_min <= 0.0 || t_min >= self.dist {
            return false;
        }
        self.dist = t_min;
        true
    }

    /// Möller–Trumbore test against the front face of triangle `abc`
    /// (counter-clockwise winding as seen from the ray).
    pub fn intersects_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) -> bool {
        let direction = self.direction();
        let ab = b - a;
        let ac = c - a;
        let p = direction.cross(ac);
        let det = ab.dot(p);
        if det < f32::EPSILON {
            return false;
        }

        let inv_det = 1.0 / det;
        let ao = self.start - a;
        let q = ao.cross(ab);
        let u = ao.dot(p) * inv_det;
        let v = direction.dot(q) * inv_det;
        if u < 0.0 || v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = ac.dot(q) * inv_det;
        if t < f32::EPSILON || t >= self.dist {
            return false;
        }
        self.dist = t;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
