use cubeworld_blocks::BlockId;

use super::TerrainGenerator;
use super::column_sampler::ColumnInfo;

impl TerrainGenerator {
    /// Layered block before carving: bedrock, stone, filler band, top block, then air.
    pub(super) fn select_surface_block(&self, info: &ColumnInfo, y: i32) -> BlockId {
        let p = &self.palette;
        if y < 0 || y > info.surface {
            p.air
        } else if y == 0 {
            p.bedrock
        } else if y == info.surface {
            info.top
        } else if y + self.cfg.surface.topsoil_thickness > info.surface {
            info.filler
        } else {
            p.stone
        }
    }
}
