//! Geometry buffers and their subsets.

use glam::{UVec4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use vesper_ecs::component::Component;
use vesper_ecs::entity::Entity;
use vesper_ecs::EcsError;

use crate::math::Aabb;

/// A contiguous index range drawn with one material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshSubset {
    pub material_id: Entity,
    pub index_offset: u32,
    pub index_count: u32,
    /// Bounds of the vertices this subset references. Rebuilt by
    /// [`MeshComponent::create_render_data`].
    #[serde(skip)]
    pub local_bound: Aabb,
}

/// Vertex and index data of a mesh, shared by every object that points at it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshComponent {
    pub flags: u32,
    pub indices: Vec<u32>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub texcoords_0: Vec<Vec2>,
    pub texcoords_1: Vec<Vec2>,
    pub joints_0: Vec<UVec4>,
    pub weights_0: Vec<Vec4>,
    pub color_0: Vec<Vec4>,
    pub subsets: Vec<MeshSubset>,
    pub armature_id: Entity,

    /// Union of all subset bounds.
    #[serde(skip)]
    pub local_bound: Aabb,
}

impl MeshComponent {
    pub const DOUBLE_SIDED: u32 = 1 << 0;
    pub const DYNAMIC: u32 = 1 << 1;

    /// Rebuild the derived bounds from the index and position buffers.
    ///
    /// # Panics
    ///
    /// Panics if a subset range or an index points outside the buffers. Use
    /// [`try_create_render_data`](Self::try_create_render_data) for buffers
    /// that come from outside the process.
    pub fn create_render_data(&mut self) {
        if let Err(err) = self.try_create_render_data() {
            panic!("{err}");
        }
    }

    /// Checked [`create_render_data`](Self::create_render_data).
    ///
    /// Every index must address a position and every subset range must lie
    /// inside the index buffer. On failure the derived bounds are left
    /// invalid.
    pub fn try_create_render_data(&mut self) -> Result<(), EcsError> {
        self.local_bound.make_invalid();
        for subset in &mut self.subsets {
            subset.local_bound.make_invalid();
        }
        self.validate()?;

        for subset in &mut self.subsets {
            let begin = subset.index_offset as usize;
            let end = begin + subset.index_count as usize;
            for &index in &self.indices[begin..end] {
                subset.local_bound.expand_point(self.positions[index as usize]);
            }
            subset.local_bound.make_valid();
            self.local_bound.union_box(&subset.local_bound);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), EcsError> {
        let invalid = |reason: String| EcsError::InvalidData {
            component: "MeshComponent",
            reason,
        };

        if let Some((at, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|&(_, &index)| index as usize >= self.positions.len())
        {
            return Err(invalid(format!(
                "index {index} at {at} exceeds {} positions",
                self.positions.len()
            )));
        }
        for subset in &self.subsets {
            let begin = u64::from(subset.index_offset);
            let end = begin + u64::from(subset.index_count);
            if end > self.indices.len() as u64 {
                return Err(invalid(format!(
                    "mesh subset [{begin}, {end}) exceeds {} indices",
                    self.indices.len()
                )));
            }
        }
        Ok(())
    }

    /// Triangles of the whole index buffer as position triples.
    pub fn triangles(&self) -> impl Iterator<Item = (Vec3, Vec3, Vec3)> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            (
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            )
        })
    }
}

impl Component for MeshComponent {
    fn on_deserialized(&mut self, _version: u32) -> Result<(), EcsError> {
        self.try_create_render_data()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
