//! Name-keyed registry of component managers.
//!
//! The [`ComponentLibrary`] owns exactly one boxed
//! [`ErasedComponentManager`] per registered component kind. Bulk
//! operations (serialize everything, merge two scenes) walk the entries by
//! name without knowing the concrete types; typed call sites go through the
//! `TypeId` index instead and get a `&ComponentManager<T>` back.

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::Component;
use crate::manager::{ComponentManager, ErasedComponentManager};
use crate::EcsError;

// ---------------------------------------------------------------------------
// LibraryEntry
// ---------------------------------------------------------------------------

/// One registered component kind.
pub struct LibraryEntry {
    name: String,
    version: u32,
    type_id: TypeId,
    manager: Box<dyn ErasedComponentManager>,
}

impl LibraryEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema version given at registration.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn manager(&self) -> &dyn ErasedComponentManager {
        self.manager.as_ref()
    }

    pub fn manager_mut(&mut self) -> &mut dyn ErasedComponentManager {
        self.manager.as_mut()
    }
}

impl std::fmt::Debug for LibraryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryEntry")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("component", &self.manager.component_type_name())
            .field("len", &self.manager.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ComponentLibrary
// ---------------------------------------------------------------------------

/// Registry of every component manager in a scene.
///
/// Entries keep registration order, which is also the order they are
/// serialized in.
#[derive(Debug, Default)]
pub struct ComponentLibrary {
    entries: Vec<LibraryEntry>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl ComponentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and own an empty `ComponentManager<T>` under `name`.
    ///
    /// Registration is one-time startup wiring.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `T` is already registered.
    pub fn register_manager<T: Component>(&mut self, name: &str, version: u32) -> &mut ComponentManager<T> {
        assert!(
            !self.by_name.contains_key(name),
            "component manager '{name}' is already registered"
        );
        let type_id = TypeId::of::<T>();
        assert!(
            !self.by_type.contains_key(&type_id),
            "component type {} is already registered",
            std::any::type_name::<T>()
        );

        let index = self.entries.len();
        self.entries.push(LibraryEntry {
            name: name.to_owned(),
            version,
            type_id,
            manager: Box::new(ComponentManager::<T>::new()),
        });
        self.by_name.insert(name.to_owned(), index);
        self.by_type.insert(type_id, index);

        tracing::debug!(manager = name, version, "registered component manager");

        self.entries[index]
            .manager
            .as_any_mut()
            .downcast_mut::<ComponentManager<T>>()
            .unwrap_or_else(|| unreachable!("freshly boxed manager has the registered type"))
    }

    /// The typed manager for `T`, if registered.
    pub fn manager<T: Component>(&self) -> Option<&ComponentManager<T>> {
        let index = *self.by_type.get(&TypeId::of::<T>())?;
        self.entries[index].manager.as_any().downcast_ref()
    }

    /// The typed manager for `T`, mutably, if registered.
    pub fn manager_mut<T: Component>(&mut self) -> Option<&mut ComponentManager<T>> {
        let index = *self.by_type.get(&TypeId::of::<T>())?;
        self.entries[index].manager.as_any_mut().downcast_mut()
    }

    /// Mutable access to two different managers at once.
    ///
    /// # Panics
    ///
    /// Panics if `A` and `B` are the same type or either is unregistered.
    pub fn manager_pair_mut<A: Component, B: Component>(
        &mut self,
    ) -> (&mut ComponentManager<A>, &mut ComponentManager<B>) {
        let a = self.type_index::<A>();
        let b = self.type_index::<B>();
        assert_ne!(a, b, "manager_pair_mut needs two distinct component types");

        let (first, second) = if a < b {
            let (head, tail) = self.entries.split_at_mut(b);
            (&mut head[a], &mut tail[0])
        } else {
            let (head, tail) = self.entries.split_at_mut(a);
            (&mut tail[0], &mut head[b])
        };

        (downcast_entry_mut(first), downcast_entry_mut(second))
    }

    fn type_index<T: Component>(&self) -> usize {
        *self.by_type.get(&TypeId::of::<T>()).unwrap_or_else(|| {
            panic!(
                "component type {} is not registered",
                std::any::type_name::<T>()
            )
        })
    }

    /// Whether `T` has a registered manager.
    pub fn is_registered<T: Component>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Entry registered under `name`.
    pub fn entry(&self, name: &str) -> Option<&LibraryEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Entry registered under `name`, mutably.
    pub fn entry_mut(&mut self, name: &str) -> Option<&mut LibraryEntry> {
        match self.by_name.get(name) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    /// Entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.iter()
    }

    /// Entries in registration order, mutably.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut LibraryEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear every manager, keeping the registrations.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.manager.clear();
        }
    }

    /// Remove `entity` from every manager.
    pub fn remove_entity(&mut self, entity: crate::entity::Entity) {
        for entry in &mut self.entries {
            entry.manager.remove(entity);
        }
    }

    /// Check that every manager of `other` has a same-named, same-kind
    /// counterpart here, without moving anything.
    pub fn check_merge(&self, other: &ComponentLibrary) -> Result<(), EcsError> {
        for other_entry in &other.entries {
            let Some(&index) = self.by_name.get(&other_entry.name) else {
                return Err(EcsError::UnknownManager {
                    name: other_entry.name.clone(),
                });
            };
            let entry = &self.entries[index];
            if entry.type_id != other_entry.type_id {
                return Err(EcsError::TypeMismatch {
                    expected: entry.manager.component_type_name(),
                    found: other_entry.manager.component_type_name(),
                });
            }
        }
        Ok(())
    }

    /// Merge every manager of `other` into the manager with the same name.
    ///
    /// Fails with [`EcsError::UnknownManager`] or [`EcsError::TypeMismatch`]
    /// (see [`check_merge`](Self::check_merge)) before anything is moved, so
    /// a failed merge leaves both libraries unchanged.
    pub fn merge(&mut self, other: &mut ComponentLibrary) -> Result<(), EcsError> {
        self.check_merge(other)?;
        for other_entry in &mut other.entries {
            let index = self.by_name[&other_entry.name];
            self.entries[index]
                .manager
                .merge(other_entry.manager.as_mut())?;
        }
        Ok(())
    }
}

fn downcast_entry_mut<T: Component>(entry: &mut LibraryEntry) -> &mut ComponentManager<T> {
    let name = entry.manager.component_type_name();
    entry
        .manager
        .as_any_mut()
        .downcast_mut()
        .unwrap_or_else(|| panic!("manager stores {name}, not {}", std::any::type_name::<T>()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
