use cubeworld_blocks::{AIR, BlockId, BlockRegistry};
use cubeworld_chunk::{CHUNK_SIZE, ChunkBuf, ChunkCoord};
use cubeworld_world::World;

use crate::face::Face;
use crate::settings::MeshSettings;

/// Value copy of everything a chunk mesh depends on. Absent neighbors read as air.
#[derive(Clone, Debug)]
pub struct MeshInput {
    pub coord: ChunkCoord,
    pub center: Option<ChunkBuf>,
    /// Face neighbors indexed by `Face::index`.
    pub neighbors: [Option<ChunkBuf>; 6],
    /// Per `(lx, lz)` (index `lz·S + lx`): lowest solid world y above the `+Y`
    /// neighbor and below the sky level. Empty means no ceiling anywhere.
    pub ceiling: Vec<Option<i32>>,
}

impl MeshInput {
    pub fn new(coord: ChunkCoord, center: Option<ChunkBuf>, neighbors: [Option<ChunkBuf>; 6]) -> Self {
        Self {
            coord,
            center,
            neighbors,
            ceiling: Vec::new(),
        }
    }

    pub fn with_ceiling(mut self, ceiling: Vec<Option<i32>>) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Captures the chunk, its six neighbors and the sky ceiling from `world`.
    pub fn from_world(world: &World, reg: &BlockRegistry, coord: ChunkCoord, settings: &MeshSettings) -> Self {
        let center = world.chunk(coord).cloned();
        let neighbors = coord.face_neighbors().map(|n| world.chunk(n).cloned());
        let s = CHUNK_SIZE as i32;
        let from_y = (coord.cy + 2) * s;
        let ceiling = if center.is_some() && from_y < settings.sky_level {
            let (ox, _, oz) = coord.origin();
            let mut out = Vec::with_capacity(CHUNK_SIZE * CHUNK_SIZE);
            for lz in 0..s {
                for lx in 0..s {
                    out.push(world.first_solid_above(reg, ox + lx, oz + lz, from_y, settings.sky_level));
                }
            }
            out
        } else {
            Vec::new()
        };
        Self {
            coord,
            center,
            neighbors,
            ceiling,
        }
    }

    #[inline]
    pub(crate) fn ceiling_at(&self, lx: usize, lz: usize) -> Option<i32> {
        self.ceiling.get(lz * CHUNK_SIZE + lx).copied().flatten()
    }

    /// Voxel at a chunk-local position that may lie one step outside the chunk
    /// along a single axis.
    #[inline]
    pub(crate) fn voxel(&self, x: i32, y: i32, z: i32) -> BlockId {
        let s = CHUNK_SIZE as i32;
        let out = |v: i32| if v < 0 { -1 } else if v >= s { 1 } else { 0 };
        let slot = match (out(x), out(y), out(z)) {
            (0, 0, 0) => {
                return match &self.center {
                    Some(buf) => buf.get_local(x as usize, y as usize, z as usize),
                    None => AIR,
                };
            }
            (-1, 0, 0) => Face::NegX,
            (1, 0, 0) => Face::PosX,
            (0, -1, 0) => Face::NegY,
            (0, 1, 0) => Face::PosY,
            (0, 0, -1) => Face::NegZ,
            (0, 0, 1) => Face::PosZ,
            _ => return AIR,
        };
        match &self.neighbors[slot.index()] {
            Some(buf) => buf.get_local(x.rem_euclid(s) as usize, y.rem_euclid(s) as usize, z.rem_euclid(s) as usize),
            None => AIR,
        }
    }
}
