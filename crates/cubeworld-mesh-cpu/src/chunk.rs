use cubeworld_chunk::{CHUNK_SIZE, ChunkCoord};
use cubeworld_geom::{Aabb, Vec3};

use crate::mesh_build::MeshBuild;

/// Which of the two geometry streams a mesh belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshStream {
    Opaque,
    Transparent,
}

impl MeshStream {
    pub const ALL: [MeshStream; 2] = [MeshStream::Opaque, MeshStream::Transparent];
}

/// CPU-side mesh of one chunk. Positions are chunk-local in `[0, S]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkMeshCPU {
    pub coord: ChunkCoord,
    /// World-space bounds of the chunk cell.
    pub bbox: Aabb,
    pub opaque: MeshBuild,
    pub transparent: MeshBuild,
    pub has_transparency: bool,
}

impl ChunkMeshCPU {
    pub fn empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            bbox: chunk_bounds(coord),
            opaque: MeshBuild::default(),
            transparent: MeshBuild::default(),
            has_transparency: false,
        }
    }

    #[inline]
    pub fn stream(&self, stream: MeshStream) -> &MeshBuild {
        match stream {
            MeshStream::Opaque => &self.opaque,
            MeshStream::Transparent => &self.transparent,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.opaque.triangle_count() + self.transparent.triangle_count()
    }

    /// World position of local `(0,0,0)`; the renderer offsets the mesh by it.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.bbox.min
    }
}

pub fn chunk_bounds(coord: ChunkCoord) -> Aabb {
    let (ox, oy, oz) = coord.origin();
    let min = Vec3::new(ox as f32, oy as f32, oz as f32);
    Aabb::new(min, min + Vec3::splat(CHUNK_SIZE as f32))
}
