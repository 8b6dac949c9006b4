//! Collaborator interfaces the core talks to: persistence, renderer, viewer feed
//! and the outbound mutation sink.

use std::path::PathBuf;

use cubeworld_blocks::BlockId;
use cubeworld_chunk::ChunkCoord;
use cubeworld_geom::{Camera, Vec3};
use cubeworld_mesh_cpu::{MeshBuild, MeshStream};
use cubeworld_world::WorldSeed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown world `{0}`")]
    UnknownWorld(String),
    #[error("malformed world metadata: {0}")]
    Metadata(String),
    #[error("persistence worker is gone")]
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldInfo {
    pub id: String,
    pub name: String,
    pub seed: WorldSeed,
}

/// Chunk and state storage. Bytes handed to `save_*` must come back verbatim from `load_*`.
pub trait Persistence: Send {
    fn load_chunk(&mut self, world: &str, chunk: ChunkCoord) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn save_chunk(&mut self, world: &str, chunk: ChunkCoord, bytes: &[u8]) -> Result<(), PersistenceError>;
    fn load_state(&mut self, world: &str, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn save_state(&mut self, world: &str, key: &str, value: &[u8]) -> Result<(), PersistenceError>;
    fn list_worlds(&mut self) -> Result<Vec<WorldInfo>, PersistenceError>;
    fn create_world(&mut self, name: &str, seed: &WorldSeed) -> Result<WorldInfo, PersistenceError>;
    fn delete_world(&mut self, id: &str) -> Result<(), PersistenceError>;
}

/// How the renderer should treat an upload for a stream it may already hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadMode {
    /// Create new buffers (replacing any previous ones).
    Allocate,
    /// Overwrite the existing buffers and update the draw range.
    InPlace,
}

/// GPU-side mesh store, driven from the main thread.
pub trait RendererSink {
    fn upload_mesh(
        &mut self,
        chunk: ChunkCoord,
        stream: MeshStream,
        geometry: &MeshBuild,
        origin: Vec3,
        mode: UploadMode,
    );
    fn remove_mesh(&mut self, chunk: ChunkCoord, stream: MeshStream);
    fn set_shadow_casting(&mut self, chunk: ChunkCoord, stream: MeshStream, enabled: bool);
    fn set_visible(&mut self, chunk: ChunkCoord, stream: MeshStream, visible: bool);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerState {
    pub position: Vec3,
    pub camera: Camera,
    /// Streaming radius in chunks.
    pub render_distance: i32,
}

pub trait ViewerFeed {
    fn viewer(&mut self) -> ViewerState;
}

impl ViewerFeed for ViewerState {
    fn viewer(&mut self) -> ViewerState {
        *self
    }
}

/// Receives every locally accepted mutation after it has been applied.
pub trait MutationSink {
    fn mutation_applied(&mut self, x: i32, y: i32, z: i32, id: BlockId);
}

/// Renderer that drops everything.
#[derive(Default, Debug)]
pub struct NullRenderer;

impl RendererSink for NullRenderer {
    fn upload_mesh(&mut self, _: ChunkCoord, _: MeshStream, _: &MeshBuild, _: Vec3, _: UploadMode) {}
    fn remove_mesh(&mut self, _: ChunkCoord, _: MeshStream) {}
    fn set_shadow_casting(&mut self, _: ChunkCoord, _: MeshStream, _: bool) {}
    fn set_visible(&mut self, _: ChunkCoord, _: MeshStream, _: bool) {}
}

impl MutationSink for Vec<(i32, i32, i32, BlockId)> {
    fn mutation_applied(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        self.push((x, y, z, id));
    }
}

impl MutationSink for crossbeam_channel::Sender<(i32, i32, i32, BlockId)> {
    fn mutation_applied(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        if self.send((x, y, z, id)).is_err() {
            log::debug!(target: "stream", "mutation receiver dropped");
        }
    }
}
