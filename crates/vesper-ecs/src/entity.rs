//! Entity identifiers and the process-wide id generator.
//!
//! An [`Entity`] is a plain 32-bit key. It carries no data; every piece of
//! state lives in a [`ComponentManager`](crate::manager::ComponentManager)
//! keyed by the entity. Ids are handed out by a single atomic counter and are
//! never recycled, so a stale `Entity` stored in another component can never
//! alias a newer one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Next id to hand out. Starts right after the reserved invalid id.
static NEXT_ID: AtomicU32 = AtomicU32::new(Entity::INVALID_ID + 1);

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An opaque entity handle.
///
/// Equality, hashing and ordering are all defined by the raw id. The
/// serialized form is the bare `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Raw id reserved for "no entity".
    pub const INVALID_ID: u32 = 0;
    /// Largest id the generator can hand out.
    pub const MAX_ID: u32 = u32::MAX;
    /// The invalid entity.
    pub const INVALID: Entity = Entity(Self::INVALID_ID);

    /// Allocate a fresh entity from the process-wide generator.
    ///
    /// Ids are strictly increasing within a process. Exhausting the 32-bit id
    /// space is unrecoverable and panics.
    pub fn create() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        assert!(
            id != Self::INVALID_ID,
            "entity id space exhausted ({} ids issued)",
            Self::MAX_ID
        );
        Self(id)
    }

    /// The id the next call to [`Entity::create`] will return.
    pub fn seed() -> u32 {
        NEXT_ID.load(Ordering::Relaxed)
    }

    /// Reset the generator so the next entity gets `seed`.
    ///
    /// This can move the counter backwards; only call it when no entity
    /// issued in this process is still referenced (e.g. a fresh world).
    pub fn set_seed(seed: u32) {
        assert!(seed != Self::INVALID_ID, "entity seed must not be the invalid id");
        NEXT_ID.store(seed, Ordering::Relaxed);
    }

    /// Move the generator forward to at least `seed`, never backwards.
    ///
    /// Used when loading persisted entities so new ids continue the saved
    /// numbering without colliding with ids already issued in this process.
    pub fn advance_seed(seed: u32) {
        NEXT_ID.fetch_max(seed, Ordering::Relaxed);
    }

    /// Wrap a raw id. `0` yields [`Entity::INVALID`].
    #[inline]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// The raw id.
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID_ID
    }

    #[inline]
    pub fn make_invalid(&mut self) {
        self.0 = Self::INVALID_ID;
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Entity({})", self.0)
        } else {
            write!(f, "Entity(INVALID)")
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
