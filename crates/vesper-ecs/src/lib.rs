//! Vesper ECS -- dense component storage keyed by plain entity ids.
//!
//! This crate provides the data layer of the Vesper engine. Every component
//! kind lives in its own [`ComponentManager`](manager::ComponentManager): a
//! dense, insertion-ordered array of components, a parallel array of owning
//! entities, and a hash index from entity to slot. A
//! [`ComponentLibrary`](library::ComponentLibrary) owns one manager per kind
//! under a stable name and drives bulk operations such as serialization and
//! scene merging.
//!
//! # Quick Start
//!
//! ```
//! use vesper_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {}
//!
//! let mut library = ComponentLibrary::new();
//! library.register_manager::<Position>("position", 1);
//!
//! let entity = Entity::create();
//! let positions = library.manager_mut::<Position>().unwrap();
//! positions.create(entity).x = 4.0;
//!
//! assert_eq!(positions.get(entity), Some(&Position { x: 4.0, y: 0.0 }));
//!
//! let view = View::new(positions);
//! assert_eq!(view.iter(positions).count(), 1);
//! ```

#![deny(unsafe_code)]

pub mod archive;
pub mod component;
pub mod entity;
pub mod library;
pub mod manager;
pub mod view;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS storage and archive operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// A value could not be written to an archive.
    #[error("failed to encode archive value: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// A value could not be read back (truncated or malformed input).
    #[error("failed to decode archive value: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// A guard value did not match what the reader expected.
    #[error("magic number mismatch: expected {expected:#x}, found {found:#x}")]
    MagicMismatch {
        expected: u64,
        found: u64,
    },

    /// A serialized block claims more elements than the platform can address.
    #[error("invalid element count {count}")]
    InvalidCount {
        count: u64,
    },

    /// A serialized owner list contains the invalid entity.
    #[error("serialized owner at index {index} is the invalid entity")]
    InvalidEntity {
        index: usize,
    },

    /// A serialized owner list contains the same entity twice.
    #[error("entity {entity:?} appears more than once in a serialized manager")]
    DuplicateEntity {
        entity: entity::Entity,
    },

    /// A type-erased operation was given a manager of another kind.
    #[error("component manager type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A decoded component failed its own consistency check.
    #[error("invalid {component}: {reason}")]
    InvalidData {
        component: &'static str,
        reason: String,
    },

    /// A manager name is not registered in the library.
    #[error("component manager '{name}' is not registered")]
    UnknownManager {
        name: String,
    },

    /// JSON conversion of a component failed.
    #[error("failed to convert component to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::archive::{ArchiveReader, ArchiveWriter};
    pub use crate::component::Component;
    pub use crate::entity::Entity;
    pub use crate::library::{ComponentLibrary, LibraryEntry};
    pub use crate::manager::{ComponentManager, ErasedComponentManager, COMPONENT_MANAGER_MAGIC};
    pub use crate::view::View;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
