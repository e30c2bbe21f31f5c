//! Scene component kinds.
//!
//! Every kind here implements [`Component`] and is registered in each
//! [`Scene`](crate::scene::Scene)'s component library under a stable name.
//! Cross-component links are plain [`Entity`] fields; they are weak and must
//! be checked with `contains` before use.

pub mod animation;
pub mod armature;
pub mod emitter;
pub mod light;
pub mod mesh;
pub mod transform;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use vesper_ecs::component::Component;
use vesper_ecs::entity::Entity;

pub use animation::{AnimatedValue, AnimationComponent, Channel, ChannelPath, Sampler};
pub use armature::ArmatureComponent;
pub use emitter::{MeshEmitterComponent, Particle, ParticleEmitterComponent};
pub use light::{Attenuation, LightComponent, LightType};
pub use mesh::{MeshComponent, MeshSubset};
pub use transform::TransformComponent;

// ---------------------------------------------------------------------------
// NameComponent
// ---------------------------------------------------------------------------

/// Display label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameComponent {
    pub name: String,
}

impl NameComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Component for NameComponent {}

// ---------------------------------------------------------------------------
// HierarchyComponent
// ---------------------------------------------------------------------------

/// Link to the parent in the transform forest. Roots have none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyComponent {
    pub parent: Entity,
}

impl Component for HierarchyComponent {}

// ---------------------------------------------------------------------------
// ObjectComponent
// ---------------------------------------------------------------------------

/// A drawable instance of a mesh. Drawn when the entity also has a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectComponent {
    pub flags: u32,
    pub mesh_id: Entity,
}

impl Default for ObjectComponent {
    fn default() -> Self {
        Self {
            flags: Self::RENDERABLE | Self::CAST_SHADOW,
            mesh_id: Entity::INVALID,
        }
    }
}

impl ObjectComponent {
    pub const RENDERABLE: u32 = 1 << 0;
    pub const CAST_SHADOW: u32 = 1 << 1;

    pub fn is_renderable(&self) -> bool {
        self.flags & Self::RENDERABLE != 0
    }

    pub fn cast_shadow(&self) -> bool {
        self.flags & Self::CAST_SHADOW != 0
    }
}

impl Component for ObjectComponent {}

// ---------------------------------------------------------------------------
// MaterialComponent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    BaseColor = 0,
    Normal = 1,
    MetallicRoughness = 2,
}

/// A texture reference resolved by the asset layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    pub enabled: bool,
    pub path: String,
}

impl Default for Texture {
    fn default() -> Self {
        Self {
            enabled: true,
            path: String::new(),
        }
    }
}

/// Metallic-roughness surface parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialComponent {
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: f32,
    pub textures: [Texture; 3],
}

impl Default for MaterialComponent {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            metallic: 0.0,
            roughness: 1.0,
            emissive: 0.0,
            textures: Default::default(),
        }
    }
}

impl MaterialComponent {
    pub fn texture(&self, slot: TextureSlot) -> &Texture {
        &self.textures[slot as usize]
    }

    pub fn texture_mut(&mut self, slot: TextureSlot) -> &mut Texture {
        &mut self.textures[slot as usize]
    }

    /// Path of an enabled, non-empty texture in `slot`.
    pub fn texture_path(&self, slot: TextureSlot) -> Option<&str> {
        let texture = self.texture(slot);
        (texture.enabled && !texture.path.is_empty()).then_some(texture.path.as_str())
    }
}

impl Component for MaterialComponent {}

// ---------------------------------------------------------------------------
// RigidBodyComponent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RigidBodyShape {
    Sphere { radius: f32 },
    Box { half_size: Vec3 },
}

/// Physics proxy consumed by an external simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyComponent {
    pub shape: RigidBodyShape,
    /// Zero means static.
    pub mass: f32,
}

impl Default for RigidBodyComponent {
    fn default() -> Self {
        Self {
            shape: RigidBodyShape::Box {
                half_size: Vec3::splat(0.5),
            },
            mass: 1.0,
        }
    }
}

impl Component for RigidBodyComponent {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_texture_path_requires_enabled_and_nonempty() {
        let mut m = MaterialComponent::default();
        assert_eq!(m.texture_path(TextureSlot::BaseColor), None);
        m.texture_mut(TextureSlot::BaseColor).path = "albedo.png".into();
        assert_eq!(m.texture_path(TextureSlot::BaseColor), Some("albedo.png"));
        m.texture_mut(TextureSlot::BaseColor).enabled = false;
        assert_eq!(m.texture_path(TextureSlot::BaseColor), None);
    }

    #[test]
    fn object_defaults_to_renderable_shadow_caster() {
        let o = ObjectComponent::default();
        assert!(o.is_renderable() && o.cast_shadow());
        assert!(!o.mesh_id.is_valid());
    }
}
