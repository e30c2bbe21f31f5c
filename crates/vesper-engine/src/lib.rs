//! Vesper Engine -- scene components and the parallel per-frame update.
//!
//! This crate builds on [`vesper_ecs`] to provide the scene layer of the
//! engine: the concrete component kinds (transforms, hierarchy links, meshes,
//! lights, skeletons, animations, emitters), a [`Scene`](scene::Scene) that
//! owns one manager per kind, and the update pipeline that turns local state
//! into world matrices, skinning matrices and a scene bound once per frame.
//!
//! Parallel stages run on a [`JobSystem`](jobs::JobSystem) backed by a
//! `rayon` pool, or inline on the caller when configured with zero threads.
//!
//! # Quick Start
//!
//! ```
//! use vesper_engine::prelude::*;
//!
//! let jobs = JobSystem::inline();
//! let mut scene = Scene::new(SceneConfig::default());
//!
//! let parent = scene.create_transform_entity("parent");
//! let child = scene.create_cube_entity("child", None, Vec3::ONE, &Mat4::IDENTITY);
//! scene.attach_component(child, parent);
//! scene
//!     .get_component_mut::<TransformComponent>(parent)
//!     .unwrap()
//!     .set_translation(Vec3::new(3.0, 0.0, 0.0));
//!
//! scene.update(&jobs, 1.0 / 60.0);
//!
//! let world = scene.get_component::<TransformComponent>(child).unwrap().world_matrix();
//! assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(3.0, 0.0, 0.0));
//! assert_eq!(scene.bound().center(), Vec3::new(3.0, 0.0, 0.0));
//! ```

#![deny(unsafe_code)]

pub mod camera;
pub mod components;
pub mod config;
pub mod geometry;
pub mod jobs;
pub mod logging;
pub mod math;
pub mod scene;
pub mod shadow;
pub mod systems;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use vesper_ecs;

pub use config::ConfigError;
pub use scene::SceneError;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use vesper_ecs::prelude::*;

    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

    pub use crate::camera::Camera;
    pub use crate::components::{
        AnimatedValue, AnimationComponent, ArmatureComponent, Attenuation, Channel, ChannelPath,
        HierarchyComponent, LightComponent, LightType, MaterialComponent, MeshComponent,
        MeshEmitterComponent, MeshSubset, NameComponent, ObjectComponent,
        ParticleEmitterComponent, RigidBodyComponent, Sampler, TransformComponent,
    };
    pub use crate::config::{ConfigError, EngineConfig, JobSystemConfig, SceneConfig};
    pub use crate::jobs::{JobArgs, JobSystem};
    pub use crate::math::{Aabb, Ray};
    pub use crate::scene::{Scene, SceneError, SCENE_DIRTY_CAMERA, SCENE_DIRTY_WORLD};
    pub use crate::shadow::{PointShadowMapPool, ShadowMapAllocator, ShadowMapHandle};
}
