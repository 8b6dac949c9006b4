//! Voxel world runtime: streaming scheduler, chunk mesh manager, raycaster and the
//! collaborator interfaces a host application plugs into.
#![forbid(unsafe_code)]

pub mod chunk_manager;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod error;
pub mod persistence;
pub mod raycast;
pub mod recording;
pub mod scheduler;

pub use chunk_manager::{
    ApplyOutcome, ChunkManager, ChunkManagerOptions, ChunkManagerStats, CullStats, DispatchOutcome, KeepSet,
    MeshEntry, MeshSlot,
};
pub use config::{ConfigError, EditRebuild, EngineConfig, StreamConfig, WorldConfig};
pub use contracts::{
    MutationSink, NullRenderer, Persistence, PersistenceError, RendererSink, UploadMode, ViewerFeed, ViewerState,
    WorldInfo,
};
pub use error::{CoreError, CoreResult, StartupError};
pub use persistence::{DirPersistence, MemoryPersistence, PersistReply, PersistRequest, PersistenceWorker};
pub use raycast::{RayHit, intersect_ray, raycast_with};
pub use recording::{RecordedMesh, RecordingRenderer};
pub use scheduler::{IntentCause, JOURNAL_KEY, StreamScheduler, StreamStats};

use std::sync::Arc;

use cubeworld_blocks::BlockRegistry;
use cubeworld_world::{TerrainGenerator, WorldGenConfig};

/// Builds the registry, terrain generator and scheduler described by `cfg`.
pub fn build_engine(cfg: &EngineConfig, backend: Box<dyn Persistence>) -> Result<StreamScheduler, StartupError> {
    let reg = match &cfg.world.blocks {
        Some(path) => BlockRegistry::load_from_path(path)?,
        None => BlockRegistry::builtin()?,
    };
    let gen_cfg = match &cfg.world.worldgen {
        Some(path) => WorldGenConfig::load_from_path(path)?,
        None => WorldGenConfig::default(),
    };
    let generator = TerrainGenerator::new(&cfg.world.seed, gen_cfg, &reg)?;
    StreamScheduler::new(cfg, Arc::new(reg), generator, backend)
}
