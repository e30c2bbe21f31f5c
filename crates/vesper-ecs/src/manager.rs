//! Dense per-kind component storage.
//!
//! A [`ComponentManager<T>`] keeps three structures in lockstep:
//!
//! - `components`: a dense `Vec<T>` in insertion order,
//! - `entities`: the owning [`Entity`] of each slot, same length and order,
//! - `lookup`: a hash index `Entity -> slot`.
//!
//! Removal swaps the last slot into the hole and patches the index entry of
//! the entity that moved, so the dense arrays never contain holes and
//! iteration never meets an invalid owner.
//!
//! [`ErasedComponentManager`] is the object-safe face of the same container,
//! used by the [`ComponentLibrary`](crate::library::ComponentLibrary) for
//! bulk operations where the concrete type is not known.

use std::any::Any;
use std::collections::HashMap;

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::component::Component;
use crate::entity::Entity;
use crate::EcsError;

/// Guard written in front of every serialized manager block.
pub const COMPONENT_MANAGER_MAGIC: u64 = 7_165_065_861_825_654_388;

// ---------------------------------------------------------------------------
// ComponentManager
// ---------------------------------------------------------------------------

/// Owns every component of kind `T`.
#[derive(Debug, Clone)]
pub struct ComponentManager<T> {
    components: Vec<T>,
    entities: Vec<Entity>,
    lookup: HashMap<Entity, usize>,
}

impl<T: Component> ComponentManager<T> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            entities: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Create an empty manager with room for `capacity` components.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            components: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity(capacity),
        }
    }

    /// Attach a default-constructed component to `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is invalid or already owns a `T`.
    pub fn create(&mut self, entity: Entity) -> &mut T {
        self.insert(entity, T::default())
    }

    /// Attach `component` to `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is invalid or already owns a `T`.
    pub fn insert(&mut self, entity: Entity, component: T) -> &mut T {
        assert!(entity.is_valid(), "cannot attach a component to the invalid entity");
        assert!(
            !self.lookup.contains_key(&entity),
            "entity {entity:?} already has a {}",
            std::any::type_name::<T>()
        );

        let index = self.components.len();
        self.lookup.insert(entity, index);
        self.components.push(component);
        self.entities.push(entity);
        &mut self.components[index]
    }

    /// The component owned by `entity`, if any.
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.lookup.get(&entity).map(|&index| &self.components[index])
    }

    /// Mutable access to the component owned by `entity`, if any.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        match self.lookup.get(&entity) {
            Some(&index) => Some(&mut self.components[index]),
            None => None,
        }
    }

    /// The component stored in dense slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn get_by_index(&self, index: usize) -> &T {
        assert!(
            index < self.components.len(),
            "component index {index} out of range (len {})",
            self.components.len()
        );
        &self.components[index]
    }

    /// Mutable access to dense slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn get_by_index_mut(&mut self, index: usize) -> &mut T {
        assert!(
            index < self.components.len(),
            "component index {index} out of range (len {})",
            self.components.len()
        );
        &mut self.components[index]
    }

    /// The owner of dense slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn entity(&self, index: usize) -> Entity {
        assert!(
            index < self.entities.len(),
            "entity index {index} out of range (len {})",
            self.entities.len()
        );
        self.entities[index]
    }

    /// Dense slot of `entity`'s component, if any.
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.lookup.get(&entity).copied()
    }

    /// Detach and return `entity`'s component. Absent entities are a no-op.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let index = self.lookup.remove(&entity)?;
        let removed = self.components.swap_remove(index);
        self.entities.swap_remove(index);

        if let Some(&moved) = self.entities.get(index) {
            self.lookup.insert(moved, index);
        }
        Some(removed)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.lookup.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Drop every component.
    pub fn clear(&mut self) {
        self.components.clear();
        self.entities.clear();
        self.lookup.clear();
    }

    /// Replace this manager's contents with a deep copy of `other`.
    pub fn copy_from(&mut self, other: &Self) {
        self.components.clone_from(&other.components);
        self.entities.clone_from(&other.entities);
        self.lookup.clone_from(&other.lookup);
    }

    /// Move every component of `other` into `self`, leaving `other` empty.
    ///
    /// # Panics
    ///
    /// Panics if any entity owns a `T` in both managers. Nothing is moved in
    /// that case.
    pub fn merge(&mut self, other: &mut Self) {
        if let Some(collision) = other.entities.iter().find(|e| self.lookup.contains_key(e)) {
            panic!(
                "cannot merge {} managers: entity {collision:?} exists in both",
                std::any::type_name::<T>()
            );
        }

        self.components.reserve(other.len());
        self.entities.reserve(other.len());
        self.lookup.reserve(other.len());

        for (entity, component) in other.entities.drain(..).zip(other.components.drain(..)) {
            self.lookup.insert(entity, self.components.len());
            self.components.push(component);
            self.entities.push(entity);
        }
        other.lookup.clear();
    }

    /// Iterate `(owner, component)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.entities.iter().copied().zip(self.components.iter())
    }

    /// Iterate `(owner, component)` pairs mutably in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.entities.iter().copied().zip(self.components.iter_mut())
    }

    /// The dense component array.
    pub fn components(&self) -> &[T] {
        &self.components
    }

    /// The dense component array, mutably. Owners cannot be changed this way.
    pub fn components_mut(&mut self) -> &mut [T] {
        &mut self.components
    }

    /// The owner array, index-aligned with [`components`](Self::components).
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Owners and components as two aligned slices, the latter mutable.
    pub fn split_mut(&mut self) -> (&[Entity], &mut [T]) {
        (&self.entities, &mut self.components)
    }

    /// Write the manager envelope: magic, count, components, owners.
    pub fn serialize(&self, archive: &mut ArchiveWriter, version: u32) -> Result<(), EcsError> {
        let _ = version;
        archive.write(&COMPONENT_MANAGER_MAGIC)?;
        archive.write(&(self.components.len() as u64))?;
        for component in &self.components {
            archive.write(component)?;
        }
        for entity in &self.entities {
            archive.write(entity)?;
        }
        Ok(())
    }

    /// Read a manager envelope written by [`serialize`](Self::serialize).
    ///
    /// The whole block is decoded and validated before the current contents
    /// are replaced, so a failed read leaves the manager untouched.
    pub fn deserialize(
        &mut self,
        archive: &mut ArchiveReader<'_>,
        version: u32,
    ) -> Result<(), EcsError> {
        let magic: u64 = archive.read()?;
        if magic != COMPONENT_MANAGER_MAGIC {
            return Err(EcsError::MagicMismatch {
                expected: COMPONENT_MANAGER_MAGIC,
                found: magic,
            });
        }

        let count: u64 = archive.read()?;
        let count = usize::try_from(count).map_err(|_| EcsError::InvalidCount { count })?;
        // Never trust the count for preallocation beyond what the input can hold.
        let mut components = Vec::with_capacity(count.min(archive.remaining()));
        for _ in 0..count {
            let mut component: T = archive.read()?;
            component.on_deserialized(version)?;
            components.push(component);
        }

        let mut entities = Vec::with_capacity(count.min(archive.remaining()));
        let mut lookup = HashMap::with_capacity(count.min(archive.remaining()));
        for index in 0..count {
            let entity: Entity = archive.read()?;
            if !entity.is_valid() {
                return Err(EcsError::InvalidEntity { index });
            }
            if lookup.insert(entity, index).is_some() {
                return Err(EcsError::DuplicateEntity { entity });
            }
            entities.push(entity);
        }

        self.components = components;
        self.entities = entities;
        self.lookup = lookup;
        Ok(())
    }

    /// `[{"entity": id, "component": {...}}, ...]` in storage order.
    pub fn to_json(&self) -> Result<serde_json::Value, EcsError> {
        let mut out = Vec::with_capacity(self.len());
        for (entity, component) in self.iter() {
            out.push(serde_json::json!({
                "entity": entity,
                "component": serde_json::to_value(component)?,
            }));
        }
        Ok(serde_json::Value::Array(out))
    }
}

impl<T: Component> Default for ComponentManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ErasedComponentManager
// ---------------------------------------------------------------------------

/// Object-safe view of a [`ComponentManager<T>`] with the concrete `T`
/// erased.
pub trait ErasedComponentManager: Any + Send + Sync {
    /// `std::any::type_name` of the stored component.
    fn component_type_name(&self) -> &'static str;

    fn clear(&mut self);

    /// Deep copy of `other`. Fails if `other` stores a different kind.
    fn copy_from(&mut self, other: &dyn ErasedComponentManager) -> Result<(), EcsError>;

    /// Move `other` into `self`. Fails if `other` stores a different kind.
    fn merge(&mut self, other: &mut dyn ErasedComponentManager) -> Result<(), EcsError>;

    /// Drop `entity`'s component, if any.
    fn remove(&mut self, entity: Entity);

    fn contains(&self, entity: Entity) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entity(&self, index: usize) -> Entity;

    fn serialize(&self, archive: &mut ArchiveWriter, version: u32) -> Result<(), EcsError>;

    fn deserialize(&mut self, archive: &mut ArchiveReader<'_>, version: u32)
        -> Result<(), EcsError>;

    fn to_json(&self) -> Result<serde_json::Value, EcsError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedComponentManager for ComponentManager<T> {
    fn component_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn clear(&mut self) {
        ComponentManager::clear(self);
    }

    fn copy_from(&mut self, other: &dyn ErasedComponentManager) -> Result<(), EcsError> {
        let found = other.component_type_name();
        let other = other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or(EcsError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })?;
        ComponentManager::copy_from(self, other);
        Ok(())
    }

    fn merge(&mut self, other: &mut dyn ErasedComponentManager) -> Result<(), EcsError> {
        let found = other.component_type_name();
        let other = other
            .as_any_mut()
            .downcast_mut::<Self>()
            .ok_or(EcsError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })?;
        ComponentManager::merge(self, other);
        Ok(())
    }

    fn remove(&mut self, entity: Entity) {
        ComponentManager::remove(self, entity);
    }

    fn contains(&self, entity: Entity) -> bool {
        ComponentManager::contains(self, entity)
    }

    fn len(&self) -> usize {
        ComponentManager::len(self)
    }

    fn entity(&self, index: usize) -> Entity {
        ComponentManager::entity(self, index)
    }

    fn serialize(&self, archive: &mut ArchiveWriter, version: u32) -> Result<(), EcsError> {
        ComponentManager::serialize(self, archive, version)
    }

    fn deserialize(
        &mut self,
        archive: &mut ArchiveReader<'_>,
        version: u32,
    ) -> Result<(), EcsError> {
        ComponentManager::deserialize(self, archive, version)
    }

    fn to_json(&self) -> Result<serde_json::Value, EcsError> {
        ComponentManager::to_json(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- test component types -----------------------------------------------

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Health(u32);

    impl Component for Health {}

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Label {
        text: String,
        #[serde(skip)]
        cached_len: usize,
    }

    impl Component for Label {
        fn on_deserialized(&mut self, _version: u32) -> Result<(), EcsError> {
            if self.text.is_empty() {
                return Err(EcsError::InvalidData {
                    component: "Label",
                    reason: "empty text".into(),
                });
            }
            self.cached_len = self.text.len();
            Ok(())
        }
    }

    fn assert_consistent<T: Component>(m: &ComponentManager<T>) {
        assert_eq!(m.components.len(), m.entities.len());
        assert_eq!(m.entities.len(), m.lookup.len());
        for (entity, &index) in &m.lookup {
            assert_eq!(m.entities[index], *entity);
        }
    }

    // -- create / lookup ----------------------------------------------------

    #[test]
    fn create_appends_default_component() {
        let mut m = ComponentManager::<Health>::new();
        let e = Entity::create();
        assert_eq!(*m.create(e), Health(0));
        assert_eq!(m.len(), 1);
        assert_eq!(m.entity(0), e);
        assert!(m.contains(e));
    }

    #[test]
    fn get_returns_none_for_absent_and_invalid() {
        let mut m = ComponentManager::<Health>::new();
        let e = Entity::create();
        m.create(e).0 = 5;
        assert_eq!(m.get(e), Some(&Health(5)));
        assert_eq!(m.get(Entity::create()), None);
        assert_eq!(m.get(Entity::INVALID), None);
    }

    #[test]
    #[should_panic(expected = "already has")]
    fn double_create_panics() {
        let mut m = ComponentManager::<Health>::new();
        let e = Entity::create();
        m.create(e);
        m.create(e);
    }

    #[test]
    #[should_panic(expected = "invalid entity")]
    fn create_on_invalid_entity_panics() {
        let mut m = ComponentManager::<Health>::new();
        m.create(Entity::INVALID);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_out_of_range_panics() {
        let m = ComponentManager::<Health>::new();
        m.get_by_index(0);
    }

    // -- remove -------------------------------------------------------------

    #[test]
    fn remove_swaps_last_into_hole_and_reindexes() {
        let mut m = ComponentManager::<Health>::new();
        let a = Entity::create();
        let b = Entity::create();
        let c = Entity::create();
        m.insert(a, Health(1));
        m.insert(b, Health(2));
        m.insert(c, Health(3));

        assert_eq!(m.remove(a), Some(Health(1)));
        assert_eq!(m.entities(), &[c, b]);
        assert_eq!(m.index_of(c), Some(0));
        assert_eq!(m.get(c), Some(&Health(3)));
        assert_consistent(&m);
    }

    #[test]
    fn remove_last_element() {
        let mut m = ComponentManager::<Health>::new();
        let a = Entity::create();
        let b = Entity::create();
        m.insert(a, Health(1));
        m.insert(b, Health(2));
        m.remove(b);
        assert_eq!(m.entities(), &[a]);
        assert_consistent(&m);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut m = ComponentManager::<Health>::new();
        let a = Entity::create();
        m.insert(a, Health(1));
        assert_eq!(m.remove(Entity::create()), None);
        assert_eq!(m.remove(Entity::INVALID), None);
        assert_eq!(m.len(), 1);
        assert_consistent(&m);
    }

    #[test]
    fn removing_twice_is_safe() {
        let mut m = ComponentManager::<Health>::new();
        let a = Entity::create();
        m.create(a);
        assert!(m.remove(a).is_some());
        assert!(m.remove(a).is_none());
        assert!(m.is_empty());
        assert_consistent(&m);
    }

    // -- merge / copy -------------------------------------------------------

    #[test]
    fn merge_moves_everything_and_empties_other() {
        let mut left = ComponentManager::<Health>::new();
        let mut right = ComponentManager::<Health>::new();
        let a = Entity::create();
        let b = Entity::create();
        left.insert(a, Health(1));
        right.insert(b, Health(2));

        left.merge(&mut right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.get(b), Some(&Health(2)));
        assert!(right.is_empty());
        assert_consistent(&left);
        assert_consistent(&right);
    }

    #[test]
    #[should_panic(expected = "exists in both")]
    fn merge_collision_panics() {
        let mut left = ComponentManager::<Health>::new();
        let mut right = ComponentManager::<Health>::new();
        let a = Entity::create();
        left.create(a);
        right.create(a);
        left.merge(&mut right);
    }

    #[test]
    fn erased_merge_rejects_other_kind() {
        let mut health = ComponentManager::<Health>::new();
        let mut label = ComponentManager::<Label>::new();
        let result = ErasedComponentManager::merge(&mut health, &mut label);
        assert!(matches!(result, Err(EcsError::TypeMismatch { .. })));
    }

    #[test]
    fn copy_from_is_deep() {
        let mut src = ComponentManager::<Health>::new();
        let a = Entity::create();
        src.insert(a, Health(9));
        let mut dst = ComponentManager::<Health>::new();
        dst.copy_from(&src);
        src.get_mut(a).unwrap().0 = 1;
        assert_eq!(dst.get(a), Some(&Health(9)));
    }

    // -- serialization ------------------------------------------------------

    #[test]
    fn archive_round_trip_preserves_pairs_and_runs_hook() {
        let mut m = ComponentManager::<Label>::new();
        let a = Entity::create();
        let b = Entity::create();
        m.create(a).text = "alpha".into();
        m.create(b).text = "be".into();

        let mut writer = ArchiveWriter::new();
        m.serialize(&mut writer, 1).unwrap();

        let mut loaded = ComponentManager::<Label>::new();
        loaded.create(Entity::create()).text = "stale".into();
        let mut reader = ArchiveReader::new(writer.as_bytes());
        loaded.deserialize(&mut reader, 1).unwrap();

        assert!(reader.is_at_end());
        assert_eq!(loaded.entities(), m.entities());
        assert_eq!(loaded.get(a).unwrap().text, "alpha");
        assert_eq!(loaded.get(a).unwrap().cached_len, 5);
        assert_eq!(loaded.get(b).unwrap().cached_len, 2);
        assert_consistent(&loaded);
    }

    #[test]
    fn bad_magic_fails_and_keeps_state() {
        let mut writer = ArchiveWriter::new();
        writer.write(&1234u64).unwrap();
        writer.write(&0u64).unwrap();

        let mut m = ComponentManager::<Health>::new();
        let a = Entity::create();
        m.insert(a, Health(3));
        let mut reader = ArchiveReader::new(writer.as_bytes());
        let err = m.deserialize(&mut reader, 1).unwrap_err();
        assert!(matches!(err, EcsError::MagicMismatch { found: 1234, .. }));
        assert_eq!(m.get(a), Some(&Health(3)));
    }

    #[test]
    fn rejected_component_fails_the_read_and_keeps_state() {
        let mut m = ComponentManager::<Label>::new();
        m.create(Entity::create()).text = "ok".into();
        m.create(Entity::create());
        let mut writer = ArchiveWriter::new();
        m.serialize(&mut writer, 1).unwrap();

        let mut loaded = ComponentManager::<Label>::new();
        let kept = Entity::create();
        loaded.create(kept).text = "kept".into();
        let mut reader = ArchiveReader::new(writer.as_bytes());
        let err = loaded.deserialize(&mut reader, 1).unwrap_err();

        assert!(matches!(err, EcsError::InvalidData { component: "Label", .. }));
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(kept).unwrap().text, "kept");
    }

    #[test]
    fn truncated_block_fails() {
        let mut m = ComponentManager::<Health>::new();
        m.insert(Entity::create(), Health(3));
        let mut writer = ArchiveWriter::new();
        m.serialize(&mut writer, 1).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = ArchiveReader::new(&bytes[..bytes.len() - 2]);
        let mut loaded = ComponentManager::<Health>::new();
        assert!(loaded.deserialize(&mut reader, 1).is_err());
        assert!(loaded.is_empty());
    }

    #[test]
    fn json_dump_lists_pairs() {
        let mut m = ComponentManager::<Health>::new();
        let a = Entity::create();
        m.insert(a, Health(7));
        let json = m.to_json().unwrap();
        assert_eq!(json[0]["entity"], serde_json::json!(a.id()));
        assert_eq!(json[0]["component"], serde_json::json!(7));
    }
}
