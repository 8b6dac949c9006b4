use cubeworld_blocks::BlockId;

use super::TerrainGenerator;
use super::column_sampler::ColumnInfo;
use super::noise::fractal3;

impl TerrainGenerator {
    /// Tunnel and cavern test for one voxel; guarded away from the surface and bedrock.
    pub fn is_cave(&self, info: &ColumnInfo, x: i32, y: i32, z: i32) -> bool {
        let caves = &self.cfg.caves;
        if !caves.enable || y < caves.min_y.max(1) || y > info.surface - caves.surface_guard {
            return false;
        }
        let (xf, yf, zf) = (x as f32, y as f32, z as f32);
        let tn = fractal3(&self.tunnel, xf, yf * caves.y_scale, zf, &caves.tunnel);
        if tn.abs() < caves.tunnel_epsilon {
            return true;
        }
        let cn = fractal3(&self.cavern, xf, yf, zf, &caves.cavern);
        cn > caves.cavern_threshold
    }

    /// Carves `base` when it sits in a cave; deep cave air turns to lava.
    /// Returns true when carved.
    pub(super) fn apply_caves(
        &self,
        info: &ColumnInfo,
        x: i32,
        y: i32,
        z: i32,
        base: &mut BlockId,
    ) -> bool {
        if *base == self.palette.air || *base == self.palette.bedrock {
            return false;
        }
        if !self.is_cave(info, x, y, z) {
            return false;
        }
        *base = if y < self.cfg.water.lava_level {
            self.palette.lava
        } else {
            self.palette.air
        };
        true
    }
}
