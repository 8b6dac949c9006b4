use cubeworld_blocks::BlockId;

use super::TerrainGenerator;
use super::noise::fractal2;

/// Per-(x, z) surface description; a pure function of seed and position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnInfo {
    /// Height of the topmost terrain voxel.
    pub surface: i32,
    pub biome: usize,
    pub top: BlockId,
    pub filler: BlockId,
}

impl TerrainGenerator {
    /// Temperature and moisture in `[0, 1]`.
    pub fn climate_at(&self, x: i32, z: i32) -> (f32, f32) {
        let tf = self.cfg.biomes.temp_frequency;
        let mf = self.cfg.biomes.moisture_frequency;
        let t = (self.temp.get_noise_2d(x as f32 * tf, z as f32 * tf) + 1.0) * 0.5;
        let m = (self.moist.get_noise_2d(x as f32 * mf, z as f32 * mf) + 1.0) * 0.5;
        (t.clamp(0.0, 1.0), m.clamp(0.0, 1.0))
    }

    pub fn biome_index_at(&self, x: i32, z: i32) -> usize {
        let (t, m) = self.climate_at(x, z);
        let defs = &self.cfg.biomes.defs;
        defs.iter()
            .position(|d| d.matches(t, m))
            .unwrap_or(defs.len() - 1)
    }

    pub fn biome_name_at(&self, x: i32, z: i32) -> &str {
        &self.cfg.biomes.defs[self.biome_index_at(x, z)].name
    }

    /// Base height and amplitude averaged over a plus-shaped neighborhood so that
    /// biome borders slope instead of stepping.
    fn blended_shape(&self, x: i32, z: i32) -> (f32, f32) {
        let r = self.cfg.height.blend_radius.max(0);
        let defs = &self.cfg.biomes.defs;
        let taps: [(i32, i32); 5] = [(0, 0), (r, 0), (-r, 0), (0, r), (0, -r)];
        let mut base = 0.0_f32;
        let mut amp = 0.0_f32;
        for (dx, dz) in taps {
            let def = &defs[self.biome_index_at(x + dx, z + dz)];
            base += def.base_height;
            amp += def.amplitude;
        }
        (base / 5.0, amp / 5.0)
    }

    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let (base, amp) = self.blended_shape(x, z);
        let n = fractal2(&self.height, x as f32, z as f32, &self.cfg.height.noise);
        let top = self.world_top();
        let hi = (top - 16).max(self.cfg.height.min_surface);
        ((base + amp * n).round() as i32).clamp(self.cfg.height.min_surface, hi)
    }

    pub fn sample_column(&self, x: i32, z: i32) -> ColumnInfo {
        let surface = self.surface_height(x, z);
        let biome = self.biome_index_at(x, z);
        let blocks = &self.palette.biomes[biome];
        let sea = self.cfg.water.sea_level;
        let (top, filler) = if surface >= self.cfg.surface.snow_line {
            (self.palette.snow, blocks.filler)
        } else if surface < sea + self.cfg.surface.beach_band {
            (self.palette.beach, self.palette.beach)
        } else {
            (blocks.top, blocks.filler)
        };
        ColumnInfo {
            surface,
            biome,
            top,
            filler,
        }
    }
}
