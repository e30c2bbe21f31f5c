//! Skeletons for skinned meshes.

use glam::Mat4;
use serde::{Deserialize, Serialize};
use vesper_ecs::component::Component;
use vesper_ecs::entity::Entity;

/// Bone list and bind pose of a skeleton.
///
/// `bone_transforms[i]` maps a vertex from bind pose to the current pose of
/// bone `i`, expressed in the armature owner's local space so one skin can be
/// shared by several instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmatureComponent {
    pub bone_collection: Vec<Entity>,
    pub inverse_bind_matrices: Vec<Mat4>,

    #[serde(skip)]
    pub bone_transforms: Vec<Mat4>,
}

impl ArmatureComponent {
    /// Recompute every skinning matrix as `inverse(owner) * bone * inverse_bind`.
    ///
    /// `bone_world` resolves a bone entity to its world matrix.
    ///
    /// # Panics
    ///
    /// Panics if the bind matrices do not match the bone list or a bone has
    /// no world matrix.
    pub fn update_bones(&mut self, owner_world: &Mat4, bone_world: impl Fn(Entity) -> Option<Mat4>) {
        assert_eq!(
            self.bone_collection.len(),
            self.inverse_bind_matrices.len(),
            "armature has {} bones but {} inverse bind matrices",
            self.bone_collection.len(),
            self.inverse_bind_matrices.len()
        );

        let inverse_owner = owner_world.inverse();
        self.bone_transforms.resize(self.bone_collection.len(), Mat4::IDENTITY);

        for (i, &bone) in self.bone_collection.iter().enumerate() {
            let world = bone_world(bone)
                .unwrap_or_else(|| panic!("armature bone {bone:?} has no transform"));
            self.bone_transforms[i] = inverse_owner * world * self.inverse_bind_matrices[i];
        }
    }
}

impl Component for ArmatureComponent {}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn skinning_matrix_is_relative_to_owner() {
        let bone = Entity::from_raw(10);
        let mut armature = ArmatureComponent {
            bone_collection: vec![bone],
            inverse_bind_matrices: vec![Mat4::IDENTITY],
            bone_transforms: Vec::new(),
        };
        let owner = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let bone_world = Mat4::from_translation(Vec3::new(7.0, 0.0, 0.0));

        armature.update_bones(&owner, |e| (e == bone).then_some(bone_world));

        let p = armature.bone_transforms[0].transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "inverse bind")]
    fn mismatched_bind_pose_panics() {
        let mut armature = ArmatureComponent {
            bone_collection: vec![Entity::from_raw(1)],
            ..Default::default()
        };
        armature.update_bones(&Mat4::IDENTITY, |_| Some(Mat4::IDENTITY));
    }
}
