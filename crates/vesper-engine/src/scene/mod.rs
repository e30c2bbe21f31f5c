//! The scene aggregate.
//!
//! A [`Scene`] owns one [`ComponentManager`] per component kind (through its
//! [`ComponentLibrary`]), the root of the transform hierarchy, an optional
//! camera, the scene-wide bound and the per-frame dirty flags. Editors,
//! importers and scripts build scenes through the typed API here; renderers
//! read the finalized component state after [`Scene::update`] returns.
//!
//! Component creation and removal are not synchronized with the update
//! pipeline. `&mut self` on every mutating method makes it impossible to call
//! them while an update is in flight.

mod serialization;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Mat4, Vec3, Vec4};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use vesper_ecs::component::Component;
use vesper_ecs::entity::Entity;
use vesper_ecs::library::ComponentLibrary;
use vesper_ecs::manager::ComponentManager;
use vesper_ecs::view::View;
use vesper_ecs::EcsError;

use crate::camera::Camera;
use crate::components::{
    AnimationComponent, ArmatureComponent, HierarchyComponent, LightComponent, LightType,
    MaterialComponent, MeshComponent, MeshEmitterComponent, NameComponent, ObjectComponent,
    ParticleEmitterComponent, RigidBodyComponent, TransformComponent,
};
use crate::config::SceneConfig;
use crate::geometry;
use crate::jobs::JobSystem;
use crate::math::{Aabb, Ray};
use crate::shadow::{PointShadowMapPool, ShadowMapAllocator};
use crate::systems;

pub use serialization::{SceneError, HAS_NEXT_FLAG, LATEST_SCENE_VERSION, SCENE_MAGIC};

/// Some transform was recomputed this frame.
pub const SCENE_DIRTY_WORLD: u32 = 1 << 0;
/// The camera matrices were recomputed this frame.
pub const SCENE_DIRTY_CAMERA: u32 = 1 << 1;

/// Name given to the root transform entity of every new scene.
pub const ROOT_NAME: &str = "world";

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

pub struct Scene {
    pub(crate) library: ComponentLibrary,
    pub(crate) root: Entity,
    pub(crate) camera: Option<Camera>,
    pub(crate) bound: Aabb,
    pub(crate) dirty_flags: AtomicU32,
    pub(crate) shadow_maps: Box<dyn ShadowMapAllocator>,
    pub(crate) rng: Pcg64,
    pub(crate) config: SceneConfig,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root)
            .field("camera", &self.camera)
            .field("bound", &self.bound)
            .field("dirty_flags", &self.dirty_flags())
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

/// Register every built-in component kind, in serialization order.
fn register_components(library: &mut ComponentLibrary) {
    library.register_manager::<NameComponent>("World::NameComponent", 0);
    library.register_manager::<TransformComponent>("World::TransformComponent", 0);
    library.register_manager::<HierarchyComponent>("World::HierarchyComponent", 0);
    library.register_manager::<MaterialComponent>("World::MaterialComponent", 0);
    library.register_manager::<MeshComponent>("World::MeshComponent", 0);
    library.register_manager::<ObjectComponent>("World::ObjectComponent", 0);
    library.register_manager::<LightComponent>("World::LightComponent", 0);
    library.register_manager::<ArmatureComponent>("World::ArmatureComponent", 0);
    library.register_manager::<AnimationComponent>("World::AnimationComponent", 0);
    library.register_manager::<RigidBodyComponent>("World::RigidBodyComponent", 0);
    library.register_manager::<MeshEmitterComponent>("World::MeshEmitterComponent", 0);
    library.register_manager::<ParticleEmitterComponent>("World::ParticleEmitterComponent", 0);
}

/// Typed manager lookup that treats an unregistered kind as a bug.
pub(crate) fn registered<T: Component>(library: &ComponentLibrary) -> &ComponentManager<T> {
    library
        .manager::<T>()
        .unwrap_or_else(|| panic!("component type {} is not registered", std::any::type_name::<T>()))
}

pub(crate) fn registered_mut<T: Component>(library: &mut ComponentLibrary) -> &mut ComponentManager<T> {
    library
        .manager_mut::<T>()
        .unwrap_or_else(|| panic!("component type {} is not registered", std::any::type_name::<T>()))
}

impl Scene {
    /// An empty scene with a root transform entity named [`ROOT_NAME`] and a
    /// [`PointShadowMapPool`] of `config.shadow_map_slots` slots.
    pub fn new(config: SceneConfig) -> Self {
        let pool = PointShadowMapPool::new(config.shadow_map_slots);
        Self::with_shadow_allocator(config, Box::new(pool))
    }

    /// Like [`Scene::new`] with a renderer-provided shadow map allocator.
    pub fn with_shadow_allocator(config: SceneConfig, shadow_maps: Box<dyn ShadowMapAllocator>) -> Self {
        let mut scene = Self::without_root(config, shadow_maps);
        scene.root = scene.create_transform_entity(ROOT_NAME);
        scene
    }

    /// Registered but empty; used as the target of a load.
    pub(crate) fn without_root(config: SceneConfig, shadow_maps: Box<dyn ShadowMapAllocator>) -> Self {
        let mut library = ComponentLibrary::new();
        register_components(&mut library);
        Self {
            library,
            root: Entity::INVALID,
            camera: None,
            bound: Aabb::INVALID,
            dirty_flags: AtomicU32::new(0),
            shadow_maps,
            rng: Pcg64::seed_from_u64(config.emitter_seed),
            config,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Top of the transform hierarchy. Never removed.
    pub fn root(&self) -> Entity {
        self.root
    }

    /// Union of every drawable object's world bound, as of the last update.
    pub fn bound(&self) -> &Aabb {
        &self.bound
    }

    /// `SCENE_DIRTY_*` bits set by the last update.
    pub fn dirty_flags(&self) -> u32 {
        self.dirty_flags.load(Ordering::Acquire)
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    pub fn set_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
    }

    pub fn library(&self) -> &ComponentLibrary {
        &self.library
    }

    /// Add a component kind beyond the built-in set.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `T` is already registered.
    pub fn register_component<T: Component>(&mut self, name: &str, version: u32) {
        self.library.register_manager::<T>(name, version);
    }

    // -----------------------------------------------------------------------
    // Typed component access
    // -----------------------------------------------------------------------

    /// # Panics
    ///
    /// Panics if `T` is not a registered component kind.
    pub fn manager<T: Component>(&self) -> &ComponentManager<T> {
        registered(&self.library)
    }

    pub fn manager_mut<T: Component>(&mut self) -> &mut ComponentManager<T> {
        registered_mut(&mut self.library)
    }

    /// Attach a default `T` to `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is invalid or already has a `T`.
    pub fn create<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.manager_mut::<T>().create(entity)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.manager::<T>().get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.manager_mut::<T>().get_mut(entity)
    }

    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        self.manager::<T>().contains(entity)
    }

    pub fn count<T: Component>(&self) -> usize {
        self.manager::<T>().len()
    }

    pub fn entity_by_index<T: Component>(&self, index: usize) -> Entity {
        self.manager::<T>().entity(index)
    }

    pub fn component_by_index<T: Component>(&self, index: usize) -> &T {
        self.manager::<T>().get_by_index(index)
    }

    /// Snapshot of the current `T` owners.
    pub fn view<T: Component>(&self) -> View<T> {
        View::new(self.manager::<T>())
    }

    /// Number of distinct entities owning at least one component.
    pub fn entity_count(&self) -> usize {
        let mut seen = HashSet::new();
        for entry in self.library.entries() {
            let manager = entry.manager();
            for index in 0..manager.len() {
                seen.insert(manager.entity(index));
            }
        }
        seen.len()
    }

    /// First entity, in storage order, whose name is `name`.
    pub fn find_entity_by_name(&self, name: &str) -> Option<Entity> {
        self.manager::<NameComponent>()
            .iter()
            .find(|(_, component)| component.name == name)
            .map(|(entity, _)| entity)
    }

    // -----------------------------------------------------------------------
    // Entity builders
    // -----------------------------------------------------------------------

    pub fn create_name_entity(&mut self, name: &str) -> Entity {
        let entity = Entity::create();
        self.manager_mut::<NameComponent>()
            .insert(entity, NameComponent::new(name));
        entity
    }

    pub fn create_transform_entity(&mut self, name: &str) -> Entity {
        let entity = self.create_name_entity(name);
        self.create::<TransformComponent>(entity);
        entity
    }

    /// Name, transform and an object without a mesh.
    pub fn create_object_entity(&mut self, name: &str) -> Entity {
        let entity = self.create_name_entity(name);
        self.create::<ObjectComponent>(entity);
        self.create::<TransformComponent>(entity);
        entity
    }

    pub fn create_mesh_entity(&mut self, name: &str) -> Entity {
        let entity = self.create_name_entity(name);
        self.create::<MeshComponent>(entity);
        entity
    }

    pub fn create_material_entity(&mut self, name: &str) -> Entity {
        let entity = self.create_name_entity(name);
        self.create::<MaterialComponent>(entity);
        entity
    }

    /// An object drawing `mesh` with `material`, or a fresh material named
    /// `"{name}:mat"`. The mesh entity is named `"{name}:mesh"`.
    pub fn create_mesh_object_entity(
        &mut self,
        name: &str,
        material: Option<Entity>,
        mut mesh: MeshComponent,
        transform: &Mat4,
    ) -> Entity {
        let material = material.unwrap_or_else(|| self.create_material_entity(&format!("{name}:mat")));
        let entity = self.create_object_entity(name);
        if let Some(local) = self.get_component_mut::<TransformComponent>(entity) {
            local.matrix_transform(transform);
        }

        let mesh_id = Entity::create();
        self.manager_mut::<NameComponent>()
            .insert(mesh_id, NameComponent::new(format!("{name}:mesh")));
        for subset in &mut mesh.subsets {
            subset.material_id = material;
        }
        self.manager_mut::<MeshComponent>().insert(mesh_id, mesh);

        if let Some(object) = self.get_component_mut::<ObjectComponent>(entity) {
            object.mesh_id = mesh_id;
        }
        entity
    }

    pub fn create_plane_entity(
        &mut self,
        name: &str,
        material: Option<Entity>,
        scale: Vec3,
        transform: &Mat4,
    ) -> Entity {
        self.create_mesh_object_entity(name, material, geometry::make_plane_mesh(scale), transform)
    }

    /// A box with half extents `scale`.
    pub fn create_cube_entity(
        &mut self,
        name: &str,
        material: Option<Entity>,
        scale: Vec3,
        transform: &Mat4,
    ) -> Entity {
        self.create_mesh_object_entity(name, material, geometry::make_cube_mesh(scale), transform)
    }

    pub fn create_sphere_entity(
        &mut self,
        name: &str,
        material: Option<Entity>,
        radius: f32,
        transform: &Mat4,
    ) -> Entity {
        let mesh = geometry::make_sphere_mesh(radius, 40, 40);
        self.create_mesh_object_entity(name, material, mesh, transform)
    }

    pub fn create_cylinder_entity(
        &mut self,
        name: &str,
        material: Option<Entity>,
        radius: f32,
        height: f32,
        transform: &Mat4,
    ) -> Entity {
        let mesh = geometry::make_cylinder_mesh(radius, height, 60);
        self.create_mesh_object_entity(name, material, mesh, transform)
    }

    /// A point light drawn as a small emissive sphere.
    ///
    /// Attenuation is `1 + 0.2 d + 0.05 d²`.
    pub fn create_point_light_entity(&mut self, name: &str, position: Vec3, color: Vec3, emissive: f32) -> Entity {
        let entity = self.create_mesh_object_entity(
            name,
            None,
            geometry::make_sphere_mesh(0.1, 40, 40),
            &Mat4::from_translation(position),
        );
        // The light is its own material.
        self.retarget_material(entity);

        let light = self.create::<LightComponent>(entity);
        light.set_light_type(LightType::Point);
        light.atten.constant = 1.0;
        light.atten.linear = 0.2;
        light.atten.quadratic = 0.05;

        self.add_emissive_material(entity, color, emissive);
        if let Some(object) = self.get_component_mut::<ObjectComponent>(entity) {
            object.flags = ObjectComponent::RENDERABLE;
        }
        entity
    }

    /// An area light drawn as a unit quad.
    pub fn create_area_light_entity(&mut self, name: &str, color: Vec3, emissive: f32) -> Entity {
        let entity = self.create_mesh_object_entity(
            name,
            None,
            geometry::make_plane_mesh(Vec3::ONE),
            &Mat4::IDENTITY,
        );
        self.retarget_material(entity);
        self.create::<LightComponent>(entity).set_light_type(LightType::Area);
        self.add_emissive_material(entity, color, emissive);
        if let Some(object) = self.get_component_mut::<ObjectComponent>(entity) {
            object.flags = ObjectComponent::RENDERABLE;
        }
        entity
    }

    /// A directional light without geometry.
    pub fn create_omni_light_entity(&mut self, name: &str, color: Vec3, emissive: f32) -> Entity {
        let entity = self.create_transform_entity(name);
        self.create::<LightComponent>(entity).set_light_type(LightType::Infinite);
        self.add_emissive_material(entity, color, emissive);
        entity
    }

    pub fn create_mesh_emitter_entity(&mut self, name: &str, translation: Vec3) -> Entity {
        let entity = self.create_name_entity(name);
        self.create::<TransformComponent>(entity).set_translation(translation);
        self.create::<MeshEmitterComponent>(entity);
        entity
    }

    pub fn create_particle_emitter_entity(&mut self, name: &str, transform: &Mat4) -> Entity {
        let entity = self.create_transform_entity(name);
        self.create::<ParticleEmitterComponent>(entity);
        if let Some(local) = self.get_component_mut::<TransformComponent>(entity) {
            local.matrix_transform(transform);
        }
        entity
    }

    /// Drop the material generated by `create_mesh_object_entity` and point
    /// the object's mesh subsets at `entity` itself.
    fn retarget_material(&mut self, entity: Entity) {
        let Some(mesh_id) = self.get_component::<ObjectComponent>(entity).map(|o| o.mesh_id) else {
            return;
        };
        let Some(mesh) = self.get_component_mut::<MeshComponent>(mesh_id) else {
            return;
        };
        let generated: Vec<Entity> = mesh.subsets.iter().map(|s| s.material_id).collect();
        for subset in &mut mesh.subsets {
            subset.material_id = entity;
        }
        for material in generated {
            self.library.remove_entity(material);
        }
    }

    fn add_emissive_material(&mut self, entity: Entity, color: Vec3, emissive: f32) {
        let material = self.create::<MaterialComponent>(entity);
        material.base_color = Vec4::from((color, 1.0));
        material.emissive = emissive;
    }

    // -----------------------------------------------------------------------
    // Hierarchy
    // -----------------------------------------------------------------------

    /// Parent `child` under `parent`, detaching it from any previous parent.
    ///
    /// # Panics
    ///
    /// Panics if `child == parent`, either entity is invalid, or `parent` is
    /// a descendant of `child`.
    pub fn attach_component(&mut self, child: Entity, parent: Entity) {
        assert!(child != parent, "cannot attach {child} to itself");
        assert!(child.is_valid(), "cannot attach the invalid entity");
        assert!(parent.is_valid(), "cannot attach {child} to the invalid entity");
        assert!(
            !self.is_descendant_of(parent, child),
            "cannot attach {child} below its own descendant {parent}"
        );

        let hierarchies = self.manager_mut::<HierarchyComponent>();
        if let Some(link) = hierarchies.get_mut(child) {
            tracing::trace!(%child, old = %link.parent, new = %parent, "re-parenting");
            link.parent = parent;
        } else {
            hierarchies.insert(child, HierarchyComponent { parent });
        }
    }

    /// Make `child` a root again. No-op if it has no parent.
    pub fn detach_component(&mut self, child: Entity) {
        self.manager_mut::<HierarchyComponent>().remove(child);
    }

    /// Whether `ancestor` appears on `entity`'s parent chain.
    pub fn is_descendant_of(&self, entity: Entity, ancestor: Entity) -> bool {
        let hierarchies = self.manager::<HierarchyComponent>();
        let mut current = entity;
        let mut depth = 0;
        while let Some(link) = hierarchies.get(current) {
            if link.parent == ancestor {
                return true;
            }
            current = link.parent;
            depth += 1;
            assert!(
                depth <= self.config.max_hierarchy_depth,
                "parent chain of {entity} exceeds depth {}",
                self.config.max_hierarchy_depth
            );
        }
        false
    }

    /// Direct children of `parent`, in hierarchy storage order.
    pub fn children_of(&self, parent: Entity) -> Vec<Entity> {
        self.manager::<HierarchyComponent>()
            .iter()
            .filter(|(_, link)| link.parent == parent)
            .map(|(child, _)| child)
            .collect()
    }

    /// Remove `entity` and its whole subtree from every component kind.
    ///
    /// Shadow map slots held by removed lights go back to the allocator.
    /// Removing an entity that owns nothing is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is the scene root.
    pub fn remove_entity(&mut self, entity: Entity) {
        assert!(entity != self.root, "the scene root cannot be removed");

        let mut pending = vec![entity];
        let mut removed = 0usize;
        while let Some(current) = pending.pop() {
            pending.extend(self.children_of(current));

            let shadow_map = self
                .get_component_mut::<LightComponent>(current)
                .and_then(|light| {
                    let handle = light.shadow_map();
                    light.set_shadow_map(None);
                    handle
                });
            if let Some(handle) = shadow_map {
                self.shadow_maps.free_point_light_shadow_map(handle);
            }

            self.library.remove_entity(current);
            removed += 1;
        }
        tracing::trace!(%entity, removed, "removed entity subtree");
    }

    /// Move everything from `other` into this scene.
    ///
    /// `other`'s root is attached under this root and the bounds are
    /// united. `other` is left empty without a root. Lights give their
    /// shadow slots back to `other`'s allocator and get new ones from this
    /// scene on the next update.
    ///
    /// Fails before touching either scene if `other` has a component kind
    /// this scene does not.
    pub fn merge(&mut self, other: &mut Scene) -> Result<(), EcsError> {
        self.library.check_merge(&other.library)?;

        let Scene {
            library,
            shadow_maps,
            ..
        } = other;
        for light in registered_mut::<LightComponent>(library).components_mut() {
            if let Some(handle) = light.shadow_map() {
                shadow_maps.free_point_light_shadow_map(handle);
                light.set_shadow_map(None);
            }
        }

        self.library.merge(&mut other.library)?;

        if other.root.is_valid() {
            self.attach_component(other.root, self.root);
            other.root = Entity::INVALID;
        }
        self.bound.union_box(&other.bound);
        other.bound = Aabb::INVALID;
        tracing::debug!(entities = self.entity_count(), "merged scene");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Picking
    // -----------------------------------------------------------------------

    /// Closest drawable object hit by `ray`, by brute force over every
    /// triangle. On a hit `ray.dist` is the hit parameter.
    pub fn intersects(&self, ray: &mut Ray) -> Option<Entity> {
        let mut hit = None;
        for (entity, object) in self.manager::<ObjectComponent>().iter() {
            if self.ray_object_intersect(entity, object, ray) {
                hit = Some(entity);
            }
        }
        hit
    }

    fn ray_object_intersect(&self, entity: Entity, object: &ObjectComponent, ray: &mut Ray) -> bool {
        let (Some(transform), Some(mesh)) = (
            self.get_component::<TransformComponent>(entity),
            self.get_component::<MeshComponent>(object.mesh_id),
        ) else {
            return false;
        };

        let inverse_model = transform.world_matrix().inverse();
        let mut local = ray.inverse(&inverse_model);
        // The box test shrinks its ray; keep it away from the triangle test.
        let mut box_ray = local;
        if !box_ray.intersects_aabb(&mesh.local_bound) {
            return false;
        }

        let mut hit = false;
        for (a, b, c) in mesh.triangles() {
            hit |= local.intersects_triangle(a, b, c);
        }
        if hit {
            ray.copy_dist(&local);
        }
        hit
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Advance the scene by `dt` seconds.
    ///
    /// Stages run in dependency order, each finishing before the next starts:
    /// lights, animation, local transforms, hierarchy, emitters, armatures,
    /// object bounds, camera.
    pub fn update(&mut self, jobs: &JobSystem, dt: f32) {
        *self.dirty_flags.get_mut() = 0;

        systems::run_light_update_system(self);
        systems::run_animation_update_system(self, jobs, dt);
        systems::run_transformation_update_system(self, jobs);
        systems::run_hierarchy_update_system(self, jobs);
        systems::run_mesh_emitter_update_system(self, dt);
        systems::run_particle_emitter_update_system(self);
        systems::run_armature_update_system(self, jobs);
        systems::run_object_update_system(self);

        if let Some(camera) = self.camera.as_mut() {
            if camera.update() {
                *self.dirty_flags.get_mut() |= SCENE_DIRTY_CAMERA;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene::new(SceneConfig::default())
    }

    #[test]
    fn new_scene_has_named_root() {
        let s = scene();
        assert!(s.root().is_valid());
        assert_eq!(s.find_entity_by_name(ROOT_NAME), Some(s.root()));
        assert!(s.contains::<TransformComponent>(s.root()));
        assert!(!s.contains::<HierarchyComponent>(s.root()));
        assert_eq!(s.entity_count(), 1);
    }

    #[test]
    fn cube_entity_wires_mesh_and_material() {
        let mut s = scene();
        let cube = s.create_cube_entity("box", None, Vec3::ONE, &Mat4::IDENTITY);
        let mesh_id = s.get_component::<ObjectComponent>(cube).unwrap().mesh_id;
        let material = s.find_entity_by_name("box:mat").unwrap();

        assert_eq!(s.find_entity_by_name("box:mesh"), Some(mesh_id));
        let mesh = s.get_component::<MeshComponent>(mesh_id).unwrap();
        assert!(mesh.subsets.iter().all(|subset| subset.material_id == material));
        assert!(s.contains::<MaterialComponent>(material));
    }

    #[test]
    fn explicit_material_is_reused() {
        let mut s = scene();
        let material = s.create_material_entity("shared");
        let a = s.create_sphere_entity("a", Some(material), 1.0, &Mat4::IDENTITY);
        let mesh_id = s.get_component::<ObjectComponent>(a).unwrap().mesh_id;
        assert_eq!(s.get_component::<MeshComponent>(mesh_id).unwrap().subsets[0].material_id, material);
        assert_eq!(s.find_entity_by_name("a:mat"), None);
    }

    #[test]
    fn point_light_is_its_own_material() {
        let mut s = scene();
        let light = s.create_point_light_entity("lamp", Vec3::new(0.0, 3.0, 0.0), Vec3::ONE, 5.0);
        assert_eq!(s.find_entity_by_name("lamp:mat"), None);
        let mesh_id = s.get_component::<ObjectComponent>(light).unwrap().mesh_id;
        assert_eq!(s.get_component::<MeshComponent>(mesh_id).unwrap().subsets[0].material_id, light);
        assert_eq!(s.get_component::<MaterialComponent>(light).unwrap().emissive, 5.0);
        assert_eq!(
            s.get_component::<TransformComponent>(light).unwrap().translation(),
            Vec3::new(0.0, 3.0, 0.0)
        );
    }

    #[test]
    fn attach_reparents() {
        let mut s = scene();
        let a = s.create_transform_entity("a");
        let b = s.create_transform_entity("b");
        let c = s.create_transform_entity("c");
        s.attach_component(c, a);
        s.attach_component(c, b);
        assert_eq!(s.get_component::<HierarchyComponent>(c).unwrap().parent, b);
        assert_eq!(s.count::<HierarchyComponent>(), 1);
        s.detach_component(c);
        assert!(!s.contains::<HierarchyComponent>(c));
    }

    #[test]
    #[should_panic(expected = "itself")]
    fn attach_to_self_panics() {
        let mut s = scene();
        let a = s.create_transform_entity("a");
        s.attach_component(a, a);
    }

    #[test]
    #[should_panic(expected = "descendant")]
    fn attach_below_descendant_panics() {
        let mut s = scene();
        let a = s.create_transform_entity("a");
        let b = s.create_transform_entity("b");
        s.attach_component(b, a);
        s.attach_component(a, b);
    }

    #[test]
    fn remove_entity_cascades_to_subtree() {
        let mut s = scene();
        let parent = s.create_transform_entity("parent");
        let child = s.create_transform_entity("child");
        let grandchild = s.create_transform_entity("grandchild");
        let other = s.create_transform_entity("other");
        s.attach_component(child, parent);
        s.attach_component(grandchild, child);

        s.remove_entity(parent);

        for e in [parent, child, grandchild] {
            assert!(!s.contains::<TransformComponent>(e));
            assert!(!s.contains::<NameComponent>(e));
            assert!(!s.contains::<HierarchyComponent>(e));
        }
        assert!(s.contains::<TransformComponent>(other));
    }

    #[test]
    fn remove_entity_frees_shadow_slot() {
        let mut s = Scene::new(SceneConfig {
            shadow_map_slots: 1,
            ..Default::default()
        });
        let jobs = JobSystem::inline();
        let a = s.create_point_light_entity("a", Vec3::ZERO, Vec3::ONE, 1.0);
        s.get_component_mut::<LightComponent>(a).unwrap().set_cast_shadow(true);
        s.update(&jobs, 0.0);
        assert!(s.get_component::<LightComponent>(a).unwrap().shadow_map().is_some());

        s.remove_entity(a);
        let b = s.create_point_light_entity("b", Vec3::ZERO, Vec3::ONE, 1.0);
        s.get_component_mut::<LightComponent>(b).unwrap().set_cast_shadow(true);
        s.update(&jobs, 0.0);
        assert!(s.get_component::<LightComponent>(b).unwrap().shadow_map().is_some());
    }

    #[test]
    #[should_panic(expected = "root")]
    fn removing_root_panics() {
        let mut s = scene();
        let root = s.root();
        s.remove_entity(root);
    }

    #[test]
    fn merge_attaches_other_root() {
        let mut a = scene();
        let mut b = scene();
        let cube = b.create_cube_entity("cube", None, Vec3::ONE, &Mat4::IDENTITY);
        let b_root = b.root();

        a.merge(&mut b).unwrap();

        assert_eq!(a.get_component::<HierarchyComponent>(b_root).unwrap().parent, a.root());
        assert!(a.contains::<ObjectComponent>(cube));
        assert_eq!(b.entity_count(), 0);
        assert!(!b.root().is_valid());
    }

    #[test]
    fn failed_merge_leaves_both_scenes_unchanged() {
        #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
        struct Tag(u32);
        impl Component for Tag {}

        let mut a = scene();
        let mut b = scene();
        b.register_component::<Tag>("Game::Tag", 0);
        let cube = b.create_cube_entity("cube", None, Vec3::ONE, &Mat4::IDENTITY);
        let lamp = b.create_point_light_entity("lamp", Vec3::Y, Vec3::ONE, 2.0);
        b.get_component_mut::<LightComponent>(lamp).unwrap().set_cast_shadow(true);
        b.update(&JobSystem::inline(), 0.0);
        let slot = b.get_component::<LightComponent>(lamp).unwrap().shadow_map();
        assert!(slot.is_some());
        let (a_count, b_count) = (a.entity_count(), b.entity_count());

        let err = a.merge(&mut b).unwrap_err();

        assert!(matches!(err, EcsError::UnknownManager { ref name } if name == "Game::Tag"));
        assert_eq!(a.entity_count(), a_count);
        assert_eq!(b.entity_count(), b_count);
        assert!(!a.contains::<ObjectComponent>(cube));
        assert!(b.contains::<ObjectComponent>(cube));
        assert!(b.root().is_valid());
        assert!(!b.contains::<HierarchyComponent>(b.root()));
        assert_eq!(b.get_component::<LightComponent>(lamp).unwrap().shadow_map(), slot);
    }

    #[test]
    fn intersects_returns_closest_object() {
        let mut s = scene();
        let near = s.create_cube_entity("near", None, Vec3::ONE, &Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)));
        let _far = s.create_cube_entity("far", None, Vec3::ONE, &Mat4::IDENTITY);
        s.update(&JobSystem::inline(), 0.0);

        let mut ray = Ray::new(Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 0.0, -20.0));
        assert_eq!(s.intersects(&mut ray), Some(near));
        assert!((ray.hit_point().z - 6.0).abs() < 1e-4);

        let mut miss = Ray::new(Vec3::new(10.0, 10.0, 20.0), Vec3::new(10.0, 10.0, -20.0));
        assert_eq!(s.intersects(&mut miss), None);
    }

    #[test]
    fn camera_update_sets_dirty_flag_once() {
        let mut s = scene();
        let jobs = JobSystem::inline();
        s.set_camera(Some(Camera::new(800, 600)));
        s.update(&jobs, 0.0);
        assert_ne!(s.dirty_flags() & SCENE_DIRTY_CAMERA, 0);
        s.update(&jobs, 0.0);
        assert_eq!(s.dirty_flags() & SCENE_DIRTY_CAMERA, 0);
    }
}
