use std::collections::{HashMap, HashSet};

use cubeworld_blocks::{AIR, BlockId, BlockRegistry};
use cubeworld_chunk::{CHUNK_SIZE, ChunkBuf, ChunkCoord, ColumnCoord, local_of};
use thiserror::Error;

use crate::generation::GeneratedColumn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("block id {0} does not fit in a voxel byte")]
    InvalidBlockId(u16),
    #[error("y = {y} lies outside the world's vertical range")]
    WorldOutOfRange { y: i32 },
}

/// Options for `World::set_voxel`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetVoxel {
    pub mark_dirty: bool,
    pub allow_create: bool,
}

impl Default for SetVoxel {
    fn default() -> Self {
        Self {
            mark_dirty: true,
            allow_create: true,
        }
    }
}

impl SetVoxel {
    /// Writes that must not allocate storage nor flag persistence, e.g. replay onto loaded data.
    pub const REPLAY: SetVoxel = SetVoxel {
        mark_dirty: false,
        allow_create: false,
    };
}

/// Sparse voxel store: only instantiated chunks exist.
#[derive(Default)]
pub struct World {
    chunks: HashMap<ChunkCoord, ChunkBuf>,
    dirty: HashSet<ChunkCoord>,
    generated: HashSet<ColumnCoord>,
    vertical: Option<(i32, i32)>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// A world that refuses to create chunks outside `cy ∈ [min_cy, max_cy]`.
    pub fn with_vertical_range(min_cy: i32, max_cy: i32) -> Self {
        Self {
            vertical: Some((min_cy, max_cy)),
            ..Self::default()
        }
    }

    #[inline]
    pub fn vertical_range(&self) -> Option<(i32, i32)> {
        self.vertical
    }

    /// Missing chunks read as air.
    #[inline]
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> BlockId {
        let coord = ChunkCoord::containing(x, y, z);
        match self.chunks.get(&coord) {
            Some(buf) => {
                let (lx, ly, lz) = local_of(x, y, z);
                buf.get_local(lx, ly, lz)
            }
            None => AIR,
        }
    }

    /// Returns whether a chunk was written. A missing chunk with `allow_create == false` is a no-op.
    pub fn set_voxel(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        id: u16,
        opts: SetVoxel,
    ) -> Result<bool, WorldError> {
        let id = BlockId::try_from(id).map_err(|_| WorldError::InvalidBlockId(id))?;
        let coord = ChunkCoord::containing(x, y, z);
        if let Some((lo, hi)) = self.vertical {
            if coord.cy < lo || coord.cy > hi {
                return Err(WorldError::WorldOutOfRange { y });
            }
        }
        let buf = match self.chunks.get_mut(&coord) {
            Some(buf) => buf,
            None if opts.allow_create => self
                .chunks
                .entry(coord)
                .or_insert_with(|| ChunkBuf::new_air(coord)),
            None => return Ok(false),
        };
        let (lx, ly, lz) = local_of(x, y, z);
        buf.set_local(lx, ly, lz, id);
        if opts.mark_dirty {
            self.dirty.insert(coord);
        }
        Ok(true)
    }

    #[inline]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkBuf> {
        self.chunks.get(&coord)
    }

    #[inline]
    pub fn has_chunk(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &ChunkBuf> {
        self.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Replaces a chunk wholesale. Does not touch the dirty-set.
    pub fn insert_chunk(&mut self, buf: ChunkBuf) -> Option<ChunkBuf> {
        self.chunks.insert(buf.coord, buf)
    }

    pub fn remove_chunk(&mut self, coord: ChunkCoord) -> Option<ChunkBuf> {
        self.dirty.remove(&coord);
        self.chunks.remove(&coord)
    }

    /// Dirty chunks in ascending coordinate order.
    pub fn dirty_chunks(&self) -> Vec<ChunkCoord> {
        let mut out: Vec<ChunkCoord> = self.dirty.iter().copied().collect();
        out.sort_unstable();
        out
    }

    #[inline]
    pub fn is_dirty(&self, coord: ChunkCoord) -> bool {
        self.dirty.contains(&coord)
    }

    pub fn mark_dirty(&mut self, coord: ChunkCoord) {
        if self.chunks.contains_key(&coord) {
            self.dirty.insert(coord);
        }
    }

    pub fn clear_dirty(&mut self, coord: ChunkCoord) {
        self.dirty.remove(&coord);
    }

    pub fn take_dirty(&mut self) -> Vec<ChunkCoord> {
        let mut out: Vec<ChunkCoord> = self.dirty.drain().collect();
        out.sort_unstable();
        out
    }

    #[inline]
    pub fn is_column_generated(&self, col: ColumnCoord) -> bool {
        self.generated.contains(&col)
    }

    pub fn generated_columns(&self) -> impl Iterator<Item = ColumnCoord> + '_ {
        self.generated.iter().copied()
    }

    pub fn generated_column_count(&self) -> usize {
        self.generated.len()
    }

    /// Writes a generated column: every layer is replaced and the column is marked generated.
    pub fn install_column(&mut self, column: GeneratedColumn) {
        let col = column.column;
        for buf in column.chunks {
            self.dirty.remove(&buf.coord);
            self.chunks.insert(buf.coord, buf);
        }
        self.generated.insert(col);
    }

    /// Lowest world y in `[from_y, to_y)` holding a solid voxel at `(x, z)`.
    /// Missing chunks are skipped as air.
    pub fn first_solid_above(
        &self,
        reg: &BlockRegistry,
        x: i32,
        z: i32,
        from_y: i32,
        to_y: i32,
    ) -> Option<i32> {
        let s = CHUNK_SIZE as i32;
        let mut y = from_y;
        while y < to_y {
            let coord = ChunkCoord::containing(x, y, z);
            let chunk_top = (coord.cy + 1) * s;
            match self.chunks.get(&coord) {
                None => y = chunk_top,
                Some(buf) => {
                    let (lx, _, lz) = local_of(x, y, z);
                    let end = chunk_top.min(to_y);
                    while y < end {
                        let ly = y.rem_euclid(s) as usize;
                        if reg.is_solid(buf.get_local(lx, ly, lz)) {
                            return Some(y);
                        }
                        y += 1;
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_chunks_read_as_air() {
        let w = World::new();
        assert_eq!(w.get_voxel(-500, 7, 1_000_000), AIR);
    }

    #[test]
    fn set_voxel_creates_and_marks_dirty() {
        let mut w = World::new();
        assert!(w.set_voxel(-1, -1, -1, 3, SetVoxel::default()).unwrap());
        assert_eq!(w.get_voxel(-1, -1, -1), 3);
        assert_eq!(w.dirty_chunks(), vec![ChunkCoord::new(-1, -1, -1)]);
    }

    #[test]
    fn oversized_ids_are_rejected() {
        let mut w = World::new();
        assert_eq!(
            w.set_voxel(0, 0, 0, 256, SetVoxel::default()),
            Err(WorldError::InvalidBlockId(256))
        );
        assert_eq!(w.chunk_count(), 0);
    }

    #[test]
    fn replay_does_not_allocate() {
        let mut w = World::new();
        assert!(!w.set_voxel(0, 0, 0, 3, SetVoxel::REPLAY).unwrap());
        assert_eq!(w.chunk_count(), 0);
        assert!(w.dirty_chunks().is_empty());
    }

    #[test]
    fn vertical_range_is_enforced() {
        let mut w = World::with_vertical_range(-1, 5);
        assert_eq!(
            w.set_voxel(0, 192, 0, 1, SetVoxel::default()),
            Err(WorldError::WorldOutOfRange { y: 192 })
        );
        assert!(w.set_voxel(0, 191, 0, 1, SetVoxel::default()).unwrap());
    }

    #[test]
    fn first_solid_above_skips_missing_chunks() {
        let reg = BlockRegistry::builtin().unwrap();
        let mut w = World::new();
        w.set_voxel(0, 75, 0, 3, SetVoxel::default()).unwrap();
        assert_eq!(w.first_solid_above(&reg, 0, 0, 0, 80), Some(75));
        assert_eq!(w.first_solid_above(&reg, 0, 0, 76, 80), None);
        w.set_voxel(1, 70, 0, 5, SetVoxel::default()).unwrap();
        assert_eq!(w.first_solid_above(&reg, 1, 0, 0, 80), None);
    }
}
