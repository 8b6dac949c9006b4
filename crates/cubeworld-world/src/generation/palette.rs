use cubeworld_blocks::{AIR, BlockId, BlockRegistry};

use crate::worldgen::{WorldGenConfig, WorldGenError};

#[derive(Clone, Debug)]
pub(crate) struct BiomeBlocks {
    pub top: BlockId,
    pub filler: BlockId,
}

#[derive(Clone, Debug)]
pub(crate) struct OreBlock {
    pub id: BlockId,
    pub y_max: i32,
    pub chance: f32,
}

/// Block names from the worldgen config, resolved once against the registry.
#[derive(Clone, Debug)]
pub(crate) struct Palette {
    pub air: BlockId,
    pub bedrock: BlockId,
    pub stone: BlockId,
    pub snow: BlockId,
    pub beach: BlockId,
    pub water: BlockId,
    pub lava: BlockId,
    pub log: BlockId,
    pub leaves: BlockId,
    pub tall_grass: BlockId,
    pub flower: BlockId,
    /// Trees and plants only root on this block. `None` disables both.
    pub grass: Option<BlockId>,
    pub ores: Vec<OreBlock>,
    pub biomes: Vec<BiomeBlocks>,
}

impl Palette {
    pub(crate) fn resolve(reg: &BlockRegistry, cfg: &WorldGenConfig) -> Result<Self, WorldGenError> {
        let id = |name: &str| {
            reg.id_by_name(name)
                .ok_or_else(|| WorldGenError::UnknownBlock(name.to_string()))
        };
        let ores = cfg
            .ores
            .iter()
            .map(|o| {
                Ok(OreBlock {
                    id: id(&o.block)?,
                    y_max: o.y_max,
                    chance: o.chance,
                })
            })
            .collect::<Result<Vec<_>, WorldGenError>>()?;
        let biomes = cfg
            .biomes
            .defs
            .iter()
            .map(|b| {
                Ok(BiomeBlocks {
                    top: id(&b.top_block)?,
                    filler: id(&b.filler_block)?,
                })
            })
            .collect::<Result<Vec<_>, WorldGenError>>()?;
        Ok(Self {
            air: AIR,
            bedrock: id(&cfg.surface.bedrock)?,
            stone: id(&cfg.surface.stone)?,
            snow: id(&cfg.surface.snow_block)?,
            beach: id(&cfg.surface.beach_block)?,
            water: id(&cfg.water.water_block)?,
            lava: id(&cfg.water.lava_block)?,
            log: id(&cfg.trees.log_block)?,
            leaves: id(&cfg.trees.leaves_block)?,
            tall_grass: id(&cfg.plants.tall_grass_block)?,
            flower: id(&cfg.plants.flower_block)?,
            grass: reg.id_by_name("grass"),
            ores,
            biomes,
        })
    }
}
