//! Math primitives shared by components and systems.
//!
//! Vectors, matrices and quaternions come from `glam`; this module adds the
//! bounding-volume and ray types the scene works with.

pub mod aabb;
pub mod ray;

pub use aabb::Aabb;
pub use ray::Ray;

/// Clamp `value` to `[0, 1]`.
#[inline]
pub fn saturate(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}
