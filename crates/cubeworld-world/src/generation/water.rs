use cubeworld_blocks::BlockId;

use super::TerrainGenerator;

impl TerrainGenerator {
    pub(super) fn apply_water_fill(&self, y: i32, base: &mut BlockId) {
        if *base == self.palette.air && y > 0 && y < self.cfg.water.sea_level {
            *base = self.palette.water;
        }
    }
}
