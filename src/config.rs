//! Engine configuration loaded from TOML. Every field has a default so partial files work.

use std::fs;
use std::path::{Path, PathBuf};

use cubeworld_mesh_cpu::MeshSettings;
use cubeworld_runtime::DEFAULT_MAX_WORKERS;
use cubeworld_world::WorldSeed;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub mesh: MeshSettings,
    #[serde(default)]
    pub world: WorldConfig,
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }
}

/// Where the mutated chunk's own rebuild runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditRebuild {
    /// On the calling thread, unless a build for the chunk is already in flight.
    #[default]
    Sync,
    Async,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    /// Streaming radius in chunks.
    #[serde(default = "default_render_distance")]
    pub render_distance: i32,
    /// Columns generated per tick.
    #[serde(default = "default_column_budget")]
    pub column_budget: usize,
    /// Outstanding persistence loads.
    #[serde(default = "default_max_pending_loads")]
    pub max_pending_loads: usize,
    #[serde(default = "default_max_dispatch_per_tick")]
    pub max_dispatch_per_tick: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: f32,
    /// Attempts allowed per chunk after a failed mesh build.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Meshes farther than this many chunk widths stop casting shadows.
    #[serde(default = "default_shadow_distance_chunks")]
    pub shadow_distance_chunks: f32,
    #[serde(default)]
    pub edit_rebuild: EditRebuild,
}

fn default_render_distance() -> i32 {
    4
}
fn default_column_budget() -> usize {
    1
}
fn default_max_pending_loads() -> usize {
    8
}
fn default_max_dispatch_per_tick() -> usize {
    4
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}
fn default_flush_interval_secs() -> f32 {
    10.0
}
fn default_retry_limit() -> u32 {
    3
}
fn default_shadow_distance_chunks() -> f32 {
    3.0
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            render_distance: default_render_distance(),
            column_budget: default_column_budget(),
            max_pending_loads: default_max_pending_loads(),
            max_dispatch_per_tick: default_max_dispatch_per_tick(),
            max_workers: default_max_workers(),
            flush_interval_secs: default_flush_interval_secs(),
            retry_limit: default_retry_limit(),
            shadow_distance_chunks: default_shadow_distance_chunks(),
            edit_rebuild: EditRebuild::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_seed")]
    pub seed: WorldSeed,
    /// Key under which chunks and state are persisted.
    #[serde(default = "default_world_id")]
    pub world_id: String,
    /// Terrain generator overrides; built-in defaults when absent.
    #[serde(default)]
    pub worldgen: Option<PathBuf>,
    /// Block table overrides; built-in table when absent.
    #[serde(default)]
    pub blocks: Option<PathBuf>,
}

fn default_seed() -> WorldSeed {
    WorldSeed::Text("cubeworld".to_string())
}
fn default_world_id() -> String {
    "default".to_string()
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            world_id: default_world_id(),
            worldgen: None,
            blocks: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.stream.column_budget, 1);
        assert_eq!(cfg.stream.max_pending_loads, 8);
        assert_eq!(cfg.stream.max_dispatch_per_tick, 4);
        assert_eq!(cfg.stream.flush_interval_secs, 10.0);
        assert_eq!(cfg.stream.edit_rebuild, EditRebuild::Sync);
        assert_eq!(cfg.mesh, MeshSettings::default());
        assert_eq!(cfg.world.world_id, "default");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [stream]
            render_distance = 6
            edit_rebuild = "async"

            [world]
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(cfg.stream.render_distance, 6);
        assert_eq!(cfg.stream.edit_rebuild, EditRebuild::Async);
        assert_eq!(cfg.stream.retry_limit, 3);
        assert_eq!(cfg.world.seed, WorldSeed::Number(42));
        assert!(EngineConfig::from_toml_str("[stream]\nrender_distance = \"far\"").is_err());
    }
}
