//! Engine configuration.
//!
//! [`EngineConfig`] is an explicit context object handed to
//! [`JobSystem::new`](crate::jobs::JobSystem::new) and
//! [`Scene::new`](crate::scene::Scene::new). Every field has a default, so a
//! JSON file only needs to name what it overrides:
//!
//! ```
//! use vesper_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "jobs": { "worker_threads": 4 } }"#).unwrap();
//! assert_eq!(config.jobs.worker_threads, 4);
//! assert_eq!(config.scene.transform_group_size, 64);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Failure to read or parse a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: u64,
        reason: &'static str,
    },
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub jobs: JobSystemConfig,
    pub scene: SceneConfig,
}

impl EngineConfig {
    /// Parse and [`validate`](Self::validate) a JSON config.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scene.validate()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// JobSystemConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSystemConfig {
    /// Size of the worker pool. 0 runs every dispatch on the caller thread.
    pub worker_threads: usize,
}

// ---------------------------------------------------------------------------
// SceneConfig
// ---------------------------------------------------------------------------

/// Per-scene update parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Transforms per job in the transform stage.
    pub transform_group_size: u32,
    /// Hierarchy links per job in the hierarchy stage.
    pub hierarchy_group_size: u32,
    pub animation_group_size: u32,
    pub armature_group_size: u32,
    /// Longest parent chain walked before the hierarchy is declared cyclic.
    pub max_hierarchy_depth: u32,
    /// Seed of the scene RNG that drives mesh emitters.
    pub emitter_seed: u64,
    /// Capacity of the default point-light shadow map pool.
    pub shadow_map_slots: u32,
}

impl SceneConfig {
    /// Reject values that would disable an update stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("scene.transform_group_size", self.transform_group_size),
            ("scene.hierarchy_group_size", self.hierarchy_group_size),
            ("scene.animation_group_size", self.animation_group_size),
            ("scene.armature_group_size", self.armature_group_size),
            ("scene.max_hierarchy_depth", self.max_hierarchy_depth),
        ];
        match positive.into_iter().find(|&(_, value)| value == 0) {
            Some((field, value)) => Err(ConfigError::Invalid {
                field,
                value: u64::from(value),
                reason: "must be at least 1",
            }),
            None => Ok(()),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            transform_group_size: 64,
            hierarchy_group_size: 64,
            animation_group_size: 1,
            armature_group_size: 1,
            max_hierarchy_depth: 32,
            emitter_seed: 0x5eed_0f_7e57,
            shadow_map_slots: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.jobs.worker_threads, 0);
        assert_eq!(config.scene.max_hierarchy_depth, 32);
    }

    #[test]
    fn partial_scene_section_keeps_other_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "scene": { "emitter_seed": 7, "shadow_map_slots": 2 } }"#)
                .unwrap();
        assert_eq!(config.scene.emitter_seed, 7);
        assert_eq!(config.scene.shadow_map_slots, 2);
        assert_eq!(config.scene.hierarchy_group_size, 64);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ jobs: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_group_size_or_depth_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "scene": { "transform_group_size": 0 } }"#)
            .unwrap_err();
        match err {
            ConfigError::Invalid { field, value, .. } => {
                assert_eq!(field, "scene.transform_group_size");
                assert_eq!(value, 0);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = EngineConfig::from_json_str(r#"{ "scene": { "max_hierarchy_depth": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "scene.max_hierarchy_depth", .. }));
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("here.json")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
