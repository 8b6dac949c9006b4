//! Chunk buffer and coordinate math shared by the world store and the mesher.
#![forbid(unsafe_code)]

mod coord;

use cubeworld_blocks::{AIR, BlockId};

pub use coord::{ChunkCoord, ColumnCoord, local_of, world_of};

/// Edge length of a cubic chunk in voxels.
pub const CHUNK_SIZE: usize = 32;
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Flat index of a local voxel: `ly·S² + lz·S + lx`.
#[inline]
pub const fn voxel_index(lx: usize, ly: usize, lz: usize) -> usize {
    (ly * CHUNK_SIZE + lz) * CHUNK_SIZE + lx
}

/// Dense `S³` byte voxels for one chunk. Zero is air.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    pub blocks: Vec<BlockId>,
}

impl ChunkBuf {
    pub fn new_air(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: vec![AIR; CHUNK_VOLUME],
        }
    }

    /// Wraps an existing voxel vector, padding or truncating it to `S³`.
    pub fn from_blocks(coord: ChunkCoord, blocks: Vec<BlockId>) -> Self {
        let mut b = blocks;
        if b.len() != CHUNK_VOLUME {
            b.resize(CHUNK_VOLUME, AIR);
        }
        ChunkBuf { coord, blocks: b }
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.blocks[voxel_index(x, y, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, id: BlockId) {
        self.blocks[voxel_index(x, y, z)] = id;
    }

    /// Local lookup that tolerates out-of-range offsets (returns `None`).
    #[inline]
    pub fn get_local_checked(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        let s = CHUNK_SIZE as i32;
        if x < 0 || y < 0 || z < 0 || x >= s || y >= s || z >= s {
            return None;
        }
        Some(self.get_local(x as usize, y as usize, z as usize))
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        ChunkCoord::containing(wx, wy, wz) == self.coord
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockId> {
        if !self.contains_world(wx, wy, wz) {
            return None;
        }
        let (lx, ly, lz) = local_of(wx, wy, wz);
        Some(self.get_local(lx, ly, lz))
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| *b != AIR)
    }

    #[inline]
    pub fn is_all_air(&self) -> bool {
        !self.has_non_air()
    }

    #[inline]
    pub fn occupancy(&self) -> ChunkOccupancy {
        if self.has_non_air() {
            ChunkOccupancy::Populated
        } else {
            ChunkOccupancy::Empty
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkOccupancy {
    Empty,
    Populated,
}

impl ChunkOccupancy {
    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, ChunkOccupancy::Empty)
    }

    #[inline]
    pub fn has_blocks(self) -> bool {
        matches!(self, ChunkOccupancy::Populated)
    }
}
