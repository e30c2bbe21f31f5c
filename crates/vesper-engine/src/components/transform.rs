//! Local TRS state and the cached world matrix.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use vesper_ecs::component::Component;
use vesper_ecs::EcsError;

/// Scale, rotation and translation of an entity relative to its parent.
///
/// The world matrix is derived state: the transform system sets it to the
/// local matrix for dirty roots and the hierarchy system overwrites it for
/// parented entities. It is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformComponent {
    flags: u32,
    scale: Vec3,
    translation: Vec3,
    rotation: Quat,
    #[serde(skip)]
    world_matrix: Mat4,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            flags: Self::DIRTY,
            scale: Vec3::ONE,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            world_matrix: Mat4::IDENTITY,
        }
    }
}

impl TransformComponent {
    pub const DIRTY: u32 = 1 << 0;

    pub fn is_dirty(&self) -> bool {
        self.flags & Self::DIRTY != 0
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            self.flags |= Self::DIRTY;
        } else {
            self.flags &= !Self::DIRTY;
        }
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.set_dirty(true);
        self.scale = scale;
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.set_dirty(true);
        self.translation = translation;
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.set_dirty(true);
        self.rotation = rotation;
    }

    /// `T * R * S`.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    pub fn set_world_matrix(&mut self, matrix: Mat4) {
        self.world_matrix = matrix;
    }

    /// If dirty, clear the flag and make the world matrix the local matrix.
    ///
    /// Returns whether anything was recomputed.
    pub fn update_transform(&mut self) -> bool {
        if self.is_dirty() {
            self.set_dirty(false);
            self.world_matrix = self.local_matrix();
            true
        } else {
            false
        }
    }

    /// Multiply the scale component-wise.
    pub fn scale_by(&mut self, scale: Vec3) {
        self.set_dirty(true);
        self.scale *= scale;
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.set_dirty(true);
        self.translation += offset;
    }

    /// Pre-multiply the rotation by XYZ Euler angles in radians.
    pub fn rotate(&mut self, euler: Vec3) {
        self.set_dirty(true);
        let delta = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
        self.rotation = (delta * self.rotation).normalize();
    }

    /// Replace the local TRS with the decomposition of `matrix`.
    pub fn set_local_transform(&mut self, matrix: &Mat4) {
        self.set_dirty(true);
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.translation = translation;
    }

    /// Apply `matrix` on top of the current local transform.
    pub fn matrix_transform(&mut self, matrix: &Mat4) {
        let combined = *matrix * self.local_matrix();
        self.set_local_transform(&combined);
    }
}

impl Component for TransformComponent {
    fn on_deserialized(&mut self, _version: u32) -> Result<(), EcsError> {
        self.set_dirty(true);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
