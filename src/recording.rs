//! In-memory renderer sink that tracks which meshes a real renderer would hold.

use cubeworld_chunk::ChunkCoord;
use cubeworld_geom::Vec3;
use cubeworld_mesh_cpu::{MeshBuild, MeshStream};
use hashbrown::HashMap;
use std::collections::BTreeSet;

use crate::contracts::{RendererSink, UploadMode};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedMesh {
    pub vertices: usize,
    pub triangles: usize,
    pub origin: Vec3,
    pub visible: bool,
    pub casts_shadows: bool,
}

#[derive(Default, Debug)]
pub struct RecordingRenderer {
    pub meshes: HashMap<(ChunkCoord, MeshStream), RecordedMesh>,
    pub allocations: usize,
    pub in_place_updates: usize,
    pub removals: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_chunks(&self) -> BTreeSet<ChunkCoord> {
        self.meshes.keys().map(|(c, _)| *c).collect()
    }

    pub fn mesh(&self, chunk: ChunkCoord, stream: MeshStream) -> Option<&RecordedMesh> {
        self.meshes.get(&(chunk, stream))
    }

    pub fn total_triangles(&self) -> usize {
        self.meshes.values().map(|m| m.triangles).sum()
    }

    pub fn visible_count(&self) -> usize {
        self.meshes.values().filter(|m| m.visible).count()
    }
}

impl RendererSink for RecordingRenderer {
    fn upload_mesh(
        &mut self,
        chunk: ChunkCoord,
        stream: MeshStream,
        geometry: &MeshBuild,
        origin: Vec3,
        mode: UploadMode,
    ) {
        match mode {
            UploadMode::Allocate => self.allocations += 1,
            UploadMode::InPlace => self.in_place_updates += 1,
        }
        let entry = self
            .meshes
            .entry((chunk, stream))
            .or_insert_with(|| RecordedMesh {
                vertices: 0,
                triangles: 0,
                origin,
                visible: true,
                casts_shadows: true,
            });
        entry.vertices = geometry.vertex_count();
        entry.triangles = geometry.triangle_count();
        entry.origin = origin;
    }

    fn remove_mesh(&mut self, chunk: ChunkCoord, stream: MeshStream) {
        if self.meshes.remove(&(chunk, stream)).is_some() {
            self.removals += 1;
        }
    }

    fn set_shadow_casting(&mut self, chunk: ChunkCoord, stream: MeshStream, enabled: bool) {
        if let Some(m) = self.meshes.get_mut(&(chunk, stream)) {
            m.casts_shadows = enabled;
        }
    }

    fn set_visible(&mut self, chunk: ChunkCoord, stream: MeshStream, visible: bool) {
        if let Some(m) = self.meshes.get_mut(&(chunk, stream)) {
            m.visible = visible;
        }
    }
}
