use cubeworld_blocks::BlockId;

use super::TerrainGenerator;
use super::noise::rand01_3;

const ORE_SALT: u32 = 0x04E5_0000;

impl TerrainGenerator {
    /// Replaces stone with the first ore rule whose roll succeeds.
    pub(super) fn apply_ores(&self, x: i32, y: i32, z: i32, base: &mut BlockId) {
        if *base != self.palette.stone {
            return;
        }
        let seed = self.seed as u32;
        for (i, ore) in self.palette.ores.iter().enumerate() {
            if y > ore.y_max || ore.y_max <= 0 {
                continue;
            }
            let depth = (ore.y_max - y) as f32 / ore.y_max as f32;
            let chance = ore.chance * (1.0 + depth);
            if rand01_3(seed, x, y, z, ORE_SALT + i as u32) < chance {
                *base = ore.id;
                return;
            }
        }
    }
}
