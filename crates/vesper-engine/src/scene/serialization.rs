//! Binary scene files and the JSON debug dump.
//!
//! Layout of a binary scene, all little-endian:
//!
//! ```text
//! u32    SCENE_MAGIC
//! u32    format version
//! u32    entity id seed
//! u32    root entity
//! camera block
//! repeat per registered component kind:
//!     u64    HAS_NEXT_FLAG
//!     string manager name
//!     manager envelope (magic, count, components, owners)
//! u64    0
//! ```
//!
//! Loading always builds a fresh [`Scene`]; the caller's scene is never
//! half-overwritten by a failed load.

use std::path::{Path, PathBuf};

use vesper_ecs::archive::{ArchiveReader, ArchiveWriter};
use vesper_ecs::entity::Entity;
use vesper_ecs::EcsError;

use super::Scene;
use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::shadow::PointShadowMapPool;

/// `"xScn"` packed into a `u32`.
pub const SCENE_MAGIC: u32 = 0x7853_636E;
/// Newest format this build reads and the one it writes.
pub const LATEST_SCENE_VERSION: u32 = 1;
/// Written before every manager block.
pub const HAS_NEXT_FLAG: u64 = 6_368_519_827_137_030_510;

/// Failure to save, load or dump a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("not a scene file: expected magic {expected:#x}, found {found:#x}")]
    MagicMismatch { expected: u32, found: u32 },

    #[error("scene format version {found} is newer than the supported version {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("scene contains unknown component manager '{name}'")]
    UnknownManager { name: String },

    #[error("scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("failed to dump scene as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Scene {
    /// Encode the whole scene in the binary format.
    pub fn serialize_to_bytes(&self) -> Result<Vec<u8>, SceneError> {
        let mut archive = ArchiveWriter::new();
        archive.write(&SCENE_MAGIC)?;
        archive.write(&LATEST_SCENE_VERSION)?;
        archive.write(&Entity::seed())?;
        archive.write(&self.root)?;

        // Scenes without a camera still carry an inactive block.
        match &self.camera {
            Some(camera) => archive.write(camera)?,
            None => archive.write(&Camera::default())?,
        }

        for entry in self.library.entries() {
            archive.write(&HAS_NEXT_FLAG)?;
            archive.write(entry.name())?;
            entry.manager().serialize(&mut archive, LATEST_SCENE_VERSION)?;
        }
        archive.write(&0u64)?;

        tracing::debug!(bytes = archive.len(), "serialized scene");
        Ok(archive.into_bytes())
    }

    /// Decode a scene produced by [`Scene::serialize_to_bytes`].
    ///
    /// The process-wide entity generator is advanced past the saved seed so
    /// new entities never collide with loaded ones.
    pub fn deserialize_from_bytes(bytes: &[u8], config: SceneConfig) -> Result<Scene, SceneError> {
        read_scene(bytes, config).inspect_err(|err| {
            tracing::error!(error = %err, "failed to load scene");
        })
    }

    pub fn save_scene_binary(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let bytes = self.serialize_to_bytes()?;
        std::fs::write(path, &bytes).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved scene");
        Ok(())
    }

    pub fn load_scene_binary(path: impl AsRef<Path>, config: SceneConfig) -> Result<Scene, SceneError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| {
            let err = SceneError::Io {
                path: path.to_path_buf(),
                source,
            };
            tracing::error!(error = %err, "failed to load scene");
            err
        })?;
        let scene = Self::deserialize_from_bytes(&bytes, config)?;
        tracing::info!(path = %path.display(), entities = scene.entity_count(), "loaded scene");
        Ok(scene)
    }

    /// Human-readable dump of the seed, root, camera and every manager.
    pub fn dump_json(&self) -> Result<String, SceneError> {
        let mut managers = serde_json::Map::new();
        for entry in self.library.entries() {
            managers.insert(entry.name().to_owned(), entry.manager().to_json()?);
        }
        let dump = serde_json::json!({
            "version": LATEST_SCENE_VERSION,
            "seed": Entity::seed(),
            "root": self.root,
            "camera": self.camera,
            "managers": managers,
        });
        Ok(serde_json::to_string_pretty(&dump)?)
    }
}

fn read_scene(bytes: &[u8], config: SceneConfig) -> Result<Scene, SceneError> {
    let mut archive = ArchiveReader::new(bytes);

    let magic: u32 = archive.read()?;
    if magic != SCENE_MAGIC {
        return Err(SceneError::MagicMismatch {
            expected: SCENE_MAGIC,
            found: magic,
        });
    }
    let version: u32 = archive.read()?;
    if version > LATEST_SCENE_VERSION {
        return Err(SceneError::VersionTooNew {
            found: version,
            supported: LATEST_SCENE_VERSION,
        });
    }
    let seed: u32 = archive.read()?;
    let root: Entity = archive.read()?;

    let mut camera: Camera = archive.read()?;
    camera.on_deserialized();

    let pool = PointShadowMapPool::new(config.shadow_map_slots);
    let mut scene = Scene::without_root(config, Box::new(pool));
    loop {
        let flag: u64 = archive.read()?;
        if flag != HAS_NEXT_FLAG {
            if flag != 0 {
                tracing::warn!(flag, "unexpected manager separator, stopping");
            }
            break;
        }
        let name: String = archive.read()?;
        let entry = scene
            .library
            .entry_mut(&name)
            .ok_or_else(|| SceneError::UnknownManager { name: name.clone() })?;
        entry.manager_mut().deserialize(&mut archive, version)?;
        tracing::trace!(manager = %name, count = entry.manager().len(), "loaded component manager");
    }

    Entity::advance_seed(seed);
    scene.root = root;
    scene.camera = camera.is_active().then_some(camera);
    tracing::debug!(version, seed, "deserialized scene");
    Ok(scene)
}
