//! Column-at-a-time terrain generation.
//!
//! Every voxel is a pure function of the seed and its world position, so a column
//! generated twice, or generated after its neighbors, comes out byte-identical.

mod caves;
mod column_sampler;
mod noise;
mod ores;
mod palette;
mod surface;
mod trees;
mod water;

use std::fmt;
use std::time::Instant;

use cubeworld_blocks::{AIR, BlockId, BlockRegistry};
use cubeworld_chunk::{CHUNK_SIZE, ChunkBuf, ColumnCoord, voxel_index};
use fastnoise_lite::FastNoiseLite;
use serde::{Deserialize, Serialize};

use crate::world::World;
use crate::worldgen::{Vertical, WorldGenConfig, WorldGenError};

pub use column_sampler::ColumnInfo;
pub use trees::TreeSite;

use palette::Palette;

const S: i32 = CHUNK_SIZE as i32;

/// World seed as typed by the player: free text or a number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorldSeed {
    Number(i64),
    Text(String),
}

impl WorldSeed {
    /// Folds the seed to the 32-bit value the noise layers use. Text is hashed with FNV-1a.
    pub fn to_i32(&self) -> i32 {
        match self {
            WorldSeed::Number(n) => (*n ^ (*n >> 32)) as i32,
            WorldSeed::Text(s) => fnv1a32(s.as_bytes()) as i32,
        }
    }
}

impl From<&str> for WorldSeed {
    fn from(s: &str) -> Self {
        WorldSeed::Text(s.to_string())
    }
}

impl From<i64> for WorldSeed {
    fn from(n: i64) -> Self {
        WorldSeed::Number(n)
    }
}

impl fmt::Display for WorldSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldSeed::Number(n) => write!(f, "{n}"),
            WorldSeed::Text(s) => f.write_str(s),
        }
    }
}

pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in bytes {
        h ^= u32::from(*b);
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

/// Output of one column: a chunk for every layer in the vertical range, ascending `cy`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedColumn {
    pub column: ColumnCoord,
    pub chunks: Vec<ChunkBuf>,
}

pub struct TerrainGenerator {
    seed: i32,
    cfg: WorldGenConfig,
    palette: Palette,
    height: FastNoiseLite,
    temp: FastNoiseLite,
    moist: FastNoiseLite,
    tunnel: FastNoiseLite,
    cavern: FastNoiseLite,
}

impl TerrainGenerator {
    pub fn new(
        seed: &WorldSeed,
        cfg: WorldGenConfig,
        reg: &BlockRegistry,
    ) -> Result<Self, WorldGenError> {
        if cfg.biomes.defs.is_empty() {
            return Err(WorldGenError::NoBiomes);
        }
        let palette = Palette::resolve(reg, &cfg)?;
        let seed = seed.to_i32();
        Ok(Self {
            seed,
            palette,
            height: noise::simplex(seed),
            temp: noise::simplex(seed ^ 0x1203_5F31),
            moist: noise::simplex(((seed as u32) ^ 0x92E3_A1B2u32) as i32),
            tunnel: noise::simplex(seed ^ 41_337),
            cavern: noise::simplex(seed ^ 99_173),
            cfg,
        })
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    #[inline]
    pub fn config(&self) -> &WorldGenConfig {
        &self.cfg
    }

    #[inline]
    pub fn vertical(&self) -> Vertical {
        self.cfg.vertical
    }

    /// One past the highest generated world y.
    #[inline]
    pub fn world_top(&self) -> i32 {
        (self.cfg.vertical.max_cy + 1) * S
    }

    pub fn generate_column(&self, col: ColumnCoord) -> GeneratedColumn {
        let start = Instant::now();
        let (ox, oz) = (col.cx * S, col.cz * S);
        let margin = self.cfg.trees.leaf_radius.max(0) + 1;
        let grid = InfoGrid::sample(self, ox - margin, oz - margin, S + 2 * margin);
        let mut w = ColumnWriter::new(col, self.cfg.vertical);
        let y_lo = (self.cfg.vertical.min_cy * S).max(0);
        let y_hi = self.world_top() - 1;
        let sea = self.cfg.water.sea_level;
        for lz in 0..S {
            for lx in 0..S {
                let (x, z) = (ox + lx, oz + lz);
                let info = *grid.get(x, z);
                let y_end = info.surface.max(sea - 1).min(y_hi);
                for y in y_lo..=y_end {
                    let mut b = self.select_surface_block(&info, y);
                    let carved = self.apply_caves(&info, x, y, z, &mut b);
                    if !carved {
                        self.apply_ores(x, y, z, &mut b);
                    }
                    self.apply_water_fill(y, &mut b);
                    if b != AIR {
                        w.set_world(x, y, z, b);
                    }
                }
            }
        }
        self.place_trees(&grid, &mut w);
        self.place_plants(&grid, &mut w);
        log::debug!(
            target: "worldgen",
            "column {},{} generated in {}ms",
            col.cx,
            col.cz,
            start.elapsed().as_millis()
        );
        GeneratedColumn {
            column: col,
            chunks: w.into_chunks(),
        }
    }

    /// Generates a column and installs it in `world`, replacing any resident layers.
    pub fn generate_into(&self, world: &mut World, col: ColumnCoord) {
        let column = self.generate_column(col);
        world.install_column(column);
    }
}

/// Column samples over a square region, row-major in z.
pub(crate) struct InfoGrid {
    x0: i32,
    z0: i32,
    size: i32,
    infos: Vec<ColumnInfo>,
}

impl InfoGrid {
    fn sample(generator: &TerrainGenerator, x0: i32, z0: i32, size: i32) -> Self {
        let mut infos = Vec::with_capacity((size * size) as usize);
        for dz in 0..size {
            for dx in 0..size {
                infos.push(generator.sample_column(x0 + dx, z0 + dz));
            }
        }
        Self {
            x0,
            z0,
            size,
            infos,
        }
    }

    #[inline]
    fn get(&self, x: i32, z: i32) -> &ColumnInfo {
        let i = (z - self.z0) * self.size + (x - self.x0);
        &self.infos[i as usize]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (i32, i32, &ColumnInfo)> + '_ {
        self.infos.iter().enumerate().map(move |(i, info)| {
            let i = i as i32;
            (self.x0 + i % self.size, self.z0 + i / self.size, info)
        })
    }
}

/// Writes into the chunk stack of one column; anything outside it is dropped.
pub(crate) struct ColumnWriter {
    col: ColumnCoord,
    min_cy: i32,
    bufs: Vec<ChunkBuf>,
}

impl ColumnWriter {
    fn new(col: ColumnCoord, vertical: Vertical) -> Self {
        let bufs = (vertical.min_cy..=vertical.max_cy)
            .map(|cy| ChunkBuf::new_air(col.chunk(cy)))
            .collect();
        Self {
            col,
            min_cy: vertical.min_cy,
            bufs,
        }
    }

    #[inline]
    pub(crate) fn contains_xz(&self, x: i32, z: i32) -> bool {
        x.div_euclid(S) == self.col.cx && z.div_euclid(S) == self.col.cz
    }

    #[inline]
    fn slot(&self, x: i32, y: i32, z: i32) -> Option<(usize, usize)> {
        if !self.contains_xz(x, z) {
            return None;
        }
        let layer = y.div_euclid(S) - self.min_cy;
        if layer < 0 || layer as usize >= self.bufs.len() {
            return None;
        }
        let idx = voxel_index(
            x.rem_euclid(S) as usize,
            y.rem_euclid(S) as usize,
            z.rem_euclid(S) as usize,
        );
        Some((layer as usize, idx))
    }

    #[inline]
    pub(crate) fn get_world(&self, x: i32, y: i32, z: i32) -> BlockId {
        match self.slot(x, y, z) {
            Some((layer, idx)) => self.bufs[layer].blocks[idx],
            None => AIR,
        }
    }

    #[inline]
    pub(crate) fn set_world(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        if let Some((layer, idx)) = self.slot(x, y, z) {
            self.bufs[layer].blocks[idx] = id;
        }
    }

    fn into_chunks(self) -> Vec<ChunkBuf> {
        self.bufs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn seeds_fold_deterministically() {
        assert_eq!(WorldSeed::from("alpha").to_i32(), WorldSeed::from("alpha").to_i32());
        assert_ne!(WorldSeed::from("alpha").to_i32(), WorldSeed::from("beta").to_i32());
        assert_eq!(WorldSeed::Number(42).to_i32(), 42);
    }

    #[test]
    fn writer_drops_out_of_column_writes() {
        let col = ColumnCoord::new(1, -1);
        let mut w = ColumnWriter::new(col, Vertical::default());
        w.set_world(31, 10, -1, 3);
        w.set_world(32, 10, -1, 3);
        w.set_world(40, 300, -5, 3);
        assert_eq!(w.get_world(32, 10, -1), 3);
        let chunks = w.into_chunks();
        assert_eq!(chunks.len(), 7);
        let total: usize = chunks.iter().map(|c| c.blocks.iter().filter(|b| **b != 0).count()).sum();
        assert_eq!(total, 1);
    }
}
