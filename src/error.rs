use cubeworld_blocks::RegistryError;
use cubeworld_edit::JournalError;
use cubeworld_runtime::{BuildFailure, RuntimeError};
use cubeworld_world::{WorldError, WorldGenError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::contracts::PersistenceError;

/// Errors surfaced by the voxel core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("block id {0} is outside the registry range")]
    InvalidBlockId(u16),
    #[error("ray direction has zero length")]
    InvalidDirection,
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] PersistenceError),
    #[error(transparent)]
    MeshBuildFailure(#[from] BuildFailure),
    #[error("y = {y} is outside the supported world range")]
    WorldOutOfRange { y: i32 },
}

impl From<WorldError> for CoreError {
    fn from(e: WorldError) -> Self {
        match e {
            WorldError::InvalidBlockId(id) => CoreError::InvalidBlockId(id),
            WorldError::WorldOutOfRange { y } => CoreError::WorldOutOfRange { y },
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures while assembling an engine: bad configuration or an unusable backend.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    WorldGen(#[from] WorldGenError),
    #[error("stored journal is unreadable: {0}")]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
