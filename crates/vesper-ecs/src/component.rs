//! The [`Component`] trait implemented by every storable component kind.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::EcsError;

/// A plain data record attached to an entity.
///
/// Components are default-constructible (a slot is created with
/// `T::default()` and then filled in), cloneable (for scene copies) and
/// `Send + Sync` so update systems can touch disjoint slots from worker
/// threads.
///
/// Serialization is field-driven through serde. Fields that are derived at
/// runtime should be `#[serde(skip)]` and rebuilt in
/// [`on_deserialized`](Component::on_deserialized).
pub trait Component:
    Default + Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Called once per component after it was read back from an archive.
    ///
    /// `version` is the format version of the archive being read. An error
    /// fails the whole read and leaves the manager untouched.
    fn on_deserialized(&mut self, version: u32) -> Result<(), EcsError> {
        let _ = version;
        Ok(())
    }
}
