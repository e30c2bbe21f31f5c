//! Point-light shadow map slots.
//!
//! The renderer owns the actual cube-map storage; the scene only needs to
//! reserve a slot for each shadow-casting point light and give it back when
//! the light goes away. [`ShadowMapAllocator`] is that seam and
//! [`PointShadowMapPool`] a fixed-capacity implementation.

use serde::{Deserialize, Serialize};

/// Index of a reserved shadow map slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShadowMapHandle(pub u32);

/// Hands out and reclaims point-light shadow map slots.
pub trait ShadowMapAllocator: Send + Sync {
    /// Reserve a slot, or `None` if every slot is taken.
    fn allocate_point_light_shadow_map(&mut self) -> Option<ShadowMapHandle>;

    /// Return a slot obtained from this allocator.
    fn free_point_light_shadow_map(&mut self, handle: ShadowMapHandle);
}

/// Fixed pool of `capacity` slots, lowest index handed out first.
#[derive(Debug, Clone)]
pub struct PointShadowMapPool {
    free: Vec<u32>,
    capacity: u32,
}

impl PointShadowMapPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            free: (0..capacity).rev().collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl ShadowMapAllocator for PointShadowMapPool {
    fn allocate_point_light_shadow_map(&mut self) -> Option<ShadowMapHandle> {
        let slot = self.free.pop().map(ShadowMapHandle);
        if slot.is_none() {
            tracing::debug!(capacity = self.capacity, "point light shadow maps exhausted");
        }
        slot
    }

    fn free_point_light_shadow_map(&mut self, handle: ShadowMapHandle) {
        assert!(
            handle.0 < self.capacity && !self.free.contains(&handle.0),
            "shadow map slot {} freed twice or not from this pool",
            handle.0
        );
        self.free.push(handle.0);
    }
}
