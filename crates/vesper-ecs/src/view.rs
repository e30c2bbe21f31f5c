//! Snapshot iteration over a component manager.
//!
//! A [`View<T>`] records the `(entity, slot)` pairs of a manager once, at
//! construction, and later iterates exactly that set. Components created
//! after the snapshot are never visited. The view does not borrow the
//! manager, so it can be taken, the manager mutated, and the view walked
//! afterwards; a recorded pair whose slot has since moved is re-resolved
//! through the manager's index, and one whose component is gone is skipped.

use std::marker::PhantomData;

use crate::component::Component;
use crate::entity::Entity;
use crate::manager::ComponentManager;

/// Bounded iteration set over one `ComponentManager<T>`.
#[derive(Debug, Clone)]
pub struct View<T> {
    snapshot: Vec<(Entity, usize)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> View<T> {
    /// Snapshot every live component of `manager` in storage order.
    pub fn new(manager: &ComponentManager<T>) -> Self {
        let snapshot = manager
            .entities()
            .iter()
            .enumerate()
            .map(|(index, &entity)| (entity, index))
            .collect();
        Self {
            snapshot,
            _marker: PhantomData,
        }
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Recorded owners, in snapshot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.snapshot.iter().map(|&(entity, _)| entity)
    }

    /// Yield `(entity, &component)` for every recorded pair still present.
    pub fn iter<'a>(
        &'a self,
        manager: &'a ComponentManager<T>,
    ) -> impl Iterator<Item = (Entity, &'a T)> + 'a {
        self.snapshot.iter().filter_map(move |&(entity, index)| {
            resolve(manager, entity, index).map(|slot| (entity, manager.get_by_index(slot)))
        })
    }

    /// Call `f` with `(entity, &mut component)` for every recorded pair
    /// still present.
    pub fn for_each_mut(&self, manager: &mut ComponentManager<T>, mut f: impl FnMut(Entity, &mut T)) {
        for &(entity, index) in &self.snapshot {
            if let Some(slot) = resolve(manager, entity, index) {
                f(entity, manager.get_by_index_mut(slot));
            }
        }
    }
}

fn resolve<T: Component>(manager: &ComponentManager<T>, entity: Entity, index: usize) -> Option<usize> {
    if index < manager.len() && manager.entity(index) == entity {
        Some(index)
    } else {
        manager.index_of(entity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
