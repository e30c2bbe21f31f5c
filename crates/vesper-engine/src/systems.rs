//! Per-frame update systems.
//!
//! Each function is one stage of [`Scene::update`](crate::scene::Scene::update)
//! and returns only after all of its jobs have finished, so consecutive calls
//! are separated by a barrier. Parallel stages hand each job a disjoint chunk
//! of one component array. Stages that need to read one slot while writing
//! another (hierarchy, animation) compute into a scratch buffer in parallel
//! and apply the results afterwards.

use std::sync::atomic::Ordering;

use glam::Mat4;
use vesper_ecs::entity::Entity;

use crate::components::{
    AnimatedValue, AnimationComponent, ArmatureComponent, HierarchyComponent, LightComponent,
    LightType, MeshComponent, MeshEmitterComponent, ObjectComponent, ParticleEmitterComponent,
    TransformComponent,
};
use crate::jobs::JobSystem;
use crate::math::Aabb;
use crate::scene::{registered, registered_mut, Scene, SCENE_DIRTY_WORLD};

// ---------------------------------------------------------------------------
// Lights
// ---------------------------------------------------------------------------

/// Copy each light's position from its transform, refresh derived state and
/// keep shadow map slots in step with the CAST_SHADOW flag.
///
/// # Panics
///
/// Panics if a light's entity has no transform.
pub fn run_light_update_system(scene: &mut Scene) {
    let Scene {
        library,
        shadow_maps,
        ..
    } = scene;
    let (lights, transforms) = library.manager_pair_mut::<LightComponent, TransformComponent>();
    let (entities, lights) = lights.split_mut();

    for (&entity, light) in entities.iter().zip(lights.iter_mut()) {
        let transform = transforms
            .get(entity)
            .unwrap_or_else(|| panic!("light {entity} has no transform"));
        light.update(transform.translation(), transform.is_dirty());

        let wants_slot = light.cast_shadow() && light.light_type() == LightType::Point;
        match (wants_slot, light.shadow_map()) {
            (true, None) => {
                let handle = shadow_maps.allocate_point_light_shadow_map();
                // Retried every frame; only the first miss is reported.
                if handle.is_none() && !light.is_shadow_map_pending() {
                    tracing::warn!(%entity, "no shadow map slot for point light");
                }
                light.set_shadow_map_pending(handle.is_none());
                light.set_shadow_map(handle);
            }
            (false, Some(handle)) => {
                shadow_maps.free_point_light_shadow_map(handle);
                light.set_shadow_map(None);
            }
            (false, None) => light.set_shadow_map_pending(false),
            (true, Some(_)) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

/// Sample every playing animation, write the values into the target
/// transforms and advance the playheads.
///
/// Sampling runs in parallel; writes are applied afterwards in storage
/// order, so when two animations drive the same target the later one wins.
pub fn run_animation_update_system(scene: &mut Scene, jobs: &JobSystem, dt: f32) {
    let group_size = scene.config.animation_group_size;
    let (animations, transforms) = scene
        .library
        .manager_pair_mut::<AnimationComponent, TransformComponent>();
    if animations.is_empty() {
        return;
    }

    let mut work: Vec<(&mut AnimationComponent, Vec<(Entity, AnimatedValue)>)> = animations
        .components_mut()
        .iter_mut()
        .map(|animation| (animation, Vec::new()))
        .collect();

    let slice = work.as_mut_slice();
    jobs.scope(move |ctx| {
        ctx.dispatch_slice_mut(slice, group_size, move |_, (animation, writes)| {
            if !animation.is_playing() {
                return;
            }
            *writes = animation.sample();
            animation.advance(dt);
        });
    });

    let mut written = 0usize;
    for (target, value) in work.into_iter().flat_map(|(_, writes)| writes) {
        let Some(transform) = transforms.get_mut(target) else {
            continue;
        };
        match value {
            AnimatedValue::Translation(v) => transform.set_translation(v),
            AnimatedValue::Rotation(q) => transform.set_rotation(q),
            AnimatedValue::Scale(v) => transform.set_scale(v),
        }
        written += 1;
    }
    tracing::trace!(written, "animation stage");
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Rebuild the world matrix of every dirty transform from its local TRS and
/// flag the scene world as changed if any did.
pub fn run_transformation_update_system(scene: &mut Scene, jobs: &JobSystem) {
    let group_size = scene.config.transform_group_size;
    let dirty_flags = &scene.dirty_flags;
    let transforms = registered_mut::<TransformComponent>(&mut scene.library).components_mut();

    jobs.scope(move |ctx| {
        ctx.dispatch_slice_mut(transforms, group_size, move |_, transform| {
            if transform.update_transform() {
                dirty_flags.fetch_or(SCENE_DIRTY_WORLD, Ordering::AcqRel);
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Set the world matrix of every parented entity to the product of the local
/// matrices up its parent chain, then clear its dirty flag.
///
/// # Panics
///
/// Panics if a parent on the chain has no transform, or if a chain is longer
/// than `max_hierarchy_depth` (which is how a cycle shows up).
pub fn run_hierarchy_update_system(scene: &mut Scene, jobs: &JobSystem) {
    let group_size = scene.config.hierarchy_group_size;
    let max_depth = scene.config.max_hierarchy_depth.max(1);
    let hierarchies = registered::<HierarchyComponent>(&scene.library);
    let transforms = registered::<TransformComponent>(&scene.library);
    if hierarchies.is_empty() {
        return;
    }

    let mut worlds: Vec<Option<Mat4>> = vec![None; hierarchies.len()];
    let slice = worlds.as_mut_slice();
    jobs.scope(move |ctx| {
        ctx.dispatch_slice_mut(slice, group_size, move |args, world| {
            let entity = hierarchies.entity(args.job_index as usize);
            let Some(transform) = transforms.get(entity) else {
                return;
            };

            let mut matrix = transform.local_matrix();
            let mut parent = hierarchies.get_by_index(args.job_index as usize).parent;
            let mut depth = 0u32;
            loop {
                let parent_transform = transforms
                    .get(parent)
                    .unwrap_or_else(|| panic!("parent {parent} of {entity} has no transform"));
                matrix = parent_transform.local_matrix() * matrix;

                let Some(link) = hierarchies.get(parent) else {
                    break;
                };
                parent = link.parent;
                depth += 1;
                assert!(
                    depth < max_depth,
                    "hierarchy above {entity} is deeper than {max_depth}; the parent graph has a cycle"
                );
            }
            *world = Some(matrix);
        });
    });

    let entities: Vec<Entity> = hierarchies.entities().to_vec();
    let transforms = registered_mut::<TransformComponent>(&mut scene.library);
    for (entity, world) in entities.into_iter().zip(worlds) {
        let (Some(world), Some(transform)) = (world, transforms.get_mut(entity)) else {
            continue;
        };
        transform.set_world_matrix(world);
        transform.set_dirty(false);
    }
}

// ---------------------------------------------------------------------------
// Emitters
// ---------------------------------------------------------------------------

/// Step every mesh emitter from its entity's world position.
pub fn run_mesh_emitter_update_system(scene: &mut Scene, dt: f32) {
    let Scene { library, rng, .. } = scene;
    let (emitters, transforms) = library.manager_pair_mut::<MeshEmitterComponent, TransformComponent>();
    let (entities, emitters) = emitters.split_mut();

    for (&entity, emitter) in entities.iter().zip(emitters.iter_mut()) {
        let origin = transforms
            .get(entity)
            .map(|t| t.world_matrix().w_axis.truncate())
            .unwrap_or_default();
        emitter.update(origin, dt, rng);
    }
}

/// Flip the double-buffered alive lists of GPU particle emitters.
pub fn run_particle_emitter_update_system(scene: &mut Scene) {
    for emitter in registered_mut::<ParticleEmitterComponent>(&mut scene.library).components_mut() {
        emitter.swap_alive_buffers();
    }
}

// ---------------------------------------------------------------------------
// Armatures
// ---------------------------------------------------------------------------

/// Recompute the skinning matrices of every armature.
///
/// An armature whose entity has no transform is treated as sitting at the
/// origin.
pub fn run_armature_update_system(scene: &mut Scene, jobs: &JobSystem) {
    let group_size = scene.config.armature_group_size;
    let (armatures, transforms) = scene
        .library
        .manager_pair_mut::<ArmatureComponent, TransformComponent>();
    let transforms = &*transforms;
    let (entities, armatures) = armatures.split_mut();

    jobs.scope(move |ctx| {
        ctx.dispatch_slice_mut(armatures, group_size, move |args, armature| {
            let owner = entities[args.job_index as usize];
            let owner_world = transforms
                .get(owner)
                .map_or(Mat4::IDENTITY, |t| *t.world_matrix());
            armature.update_bones(&owner_world, |bone| {
                transforms.get(bone).map(|t| *t.world_matrix())
            });
        });
    });
}

// ---------------------------------------------------------------------------
// Object bounds
// ---------------------------------------------------------------------------

/// Recompute the scene bound as the union of every object's mesh bound in
/// world space. Objects without a transform or mesh are ignored.
pub fn run_object_update_system(scene: &mut Scene) {
    let objects = registered::<ObjectComponent>(&scene.library);
    let transforms = registered::<TransformComponent>(&scene.library);
    let meshes = registered::<MeshComponent>(&scene.library);

    let mut bound = Aabb::INVALID;
    for (entity, object) in objects.iter() {
        let (Some(transform), Some(mesh)) = (transforms.get(entity), meshes.get(object.mesh_id)) else {
            continue;
        };
        let mut world_bound = mesh.local_bound;
        world_bound.apply_matrix(transform.world_matrix());
        bound.union_box(&world_bound);
    }
    scene.bound = bound;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
