use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::config::{BlockDef, BlocksConfig, ShapeConfig, TilesDef};
use super::types::{
    AIR, BLOCK_ID_COUNT, BlockId, BlockType, CustomShape, DoorHalf, FaceRole, Shape, Tile,
    ToolProps,
};

const BUILTIN_BLOCKS: &str = include_str!("../assets/blocks.toml");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("block id {0} does not fit in a voxel byte")]
    IdOutOfRange(u16),
    #[error("block id {0} is defined twice")]
    DuplicateId(BlockId),
    #[error("block name `{0}` is defined twice")]
    DuplicateName(String),
    #[error("id 0 is reserved for air, found `{0}`")]
    AirReserved(String),
    #[error("block `{block}` has unknown shape `{kind}`")]
    UnknownShape { block: String, kind: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

/// Dense block table indexed by id. Unregistered slots hold the stone-like sentinel.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<BlockType>,
    by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Registry holding only air.
    pub fn new() -> Self {
        let mut blocks: Vec<BlockType> = (0..BLOCK_ID_COUNT)
            .map(|i| BlockType::unregistered(i as BlockId))
            .collect();
        blocks[AIR as usize] = air_type();
        let mut by_name = HashMap::new();
        by_name.insert("air".to_string(), AIR);
        Self { blocks, by_name }
    }

    /// The default block table shipped with the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml_str(BUILTIN_BLOCKS)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RegistryError> {
        let cfg: BlocksConfig = toml::from_str(text)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, RegistryError> {
        let mut reg = BlockRegistry::new();
        let mut seen = [false; BLOCK_ID_COUNT];
        seen[AIR as usize] = true;
        for def in cfg.blocks.into_iter() {
            let id = u8::try_from(def.id).map_err(|_| RegistryError::IdOutOfRange(def.id))?;
            if id == AIR {
                if def.name != "air" {
                    return Err(RegistryError::AirReserved(def.name));
                }
                continue;
            }
            if seen[id as usize] {
                return Err(RegistryError::DuplicateId(id));
            }
            if reg.by_name.contains_key(&def.name) {
                return Err(RegistryError::DuplicateName(def.name));
            }
            seen[id as usize] = true;
            let ty = compile_block(id, def)?;
            reg.by_name.insert(ty.name.clone(), id);
            reg.blocks[id as usize] = ty;
        }
        Ok(reg)
    }

    /// Always returns an entry; unknown ids resolve to the sentinel.
    #[inline]
    pub fn get(&self, id: BlockId) -> &BlockType {
        &self.blocks[id as usize]
    }

    #[inline]
    pub fn is_registered(&self, id: BlockId) -> bool {
        self.blocks[id as usize].registered
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn is_solid(&self, id: BlockId) -> bool {
        self.blocks[id as usize].solid
    }

    #[inline]
    pub fn is_transparent(&self, id: BlockId) -> bool {
        self.blocks[id as usize].transparent
    }

    #[inline]
    pub fn is_fluid(&self, id: BlockId) -> bool {
        self.blocks[id as usize].fluid
    }

    #[inline]
    pub fn shape(&self, id: BlockId) -> Shape {
        self.blocks[id as usize].shape
    }

    #[inline]
    pub fn tile(&self, id: BlockId, role: FaceRole) -> Tile {
        self.blocks[id as usize].tile(role)
    }

    pub fn registered(&self) -> impl Iterator<Item = &BlockType> {
        self.blocks.iter().filter(|b| b.registered)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn air_type() -> BlockType {
    BlockType {
        id: AIR,
        name: "air".to_string(),
        registered: true,
        solid: false,
        transparent: true,
        fluid: false,
        shape: Shape::None,
        tiles: [Tile::default(); 6],
        hardness: 0.0,
        best_tool: None,
        food_restore: None,
        tool: None,
    }
}

fn compile_block(id: BlockId, def: BlockDef) -> Result<BlockType, RegistryError> {
    let shape = match def.shape.as_ref() {
        Some(cfg) => compile_shape(&def.name, cfg)?,
        None => Shape::Cube,
    };
    let fluid = def.fluid.unwrap_or(false);
    let solid = def
        .solid
        .unwrap_or(!fluid && matches!(shape, Shape::Cube | Shape::Custom(_)));
    let transparent = def.transparent.unwrap_or(shape != Shape::Cube);
    let tiles = resolve_tiles(def.tiles.as_ref());
    Ok(BlockType {
        id,
        name: def.name,
        registered: true,
        solid,
        transparent,
        fluid,
        shape,
        tiles,
        hardness: def.hardness.unwrap_or(1.0),
        best_tool: def.best_tool,
        food_restore: def.food_restore,
        tool: def.tool.map(|t| ToolProps {
            kind: t.kind,
            tier: t.tier,
            damage: t.damage,
            durability: t.durability,
        }),
    })
}

fn compile_shape(block: &str, cfg: &ShapeConfig) -> Result<Shape, RegistryError> {
    let (kind, half, open) = match cfg {
        ShapeConfig::Simple(s) => (s.as_str(), None, false),
        ShapeConfig::Detailed(d) => (d.kind.as_str(), d.half.as_deref(), d.open.unwrap_or(false)),
    };
    let shape = match kind {
        "none" => Shape::None,
        "cube" => Shape::Cube,
        "cross" => Shape::Cross,
        "torch" => Shape::Custom(CustomShape::Torch),
        "lantern" => Shape::Custom(CustomShape::Lantern),
        "cactus" => Shape::Custom(CustomShape::Cactus),
        "chest" => Shape::Custom(if open {
            CustomShape::ChestOpen
        } else {
            CustomShape::ChestClosed
        }),
        "fence" => Shape::Custom(CustomShape::Fence),
        "ladder" => Shape::Custom(CustomShape::Ladder),
        "slab" => Shape::Custom(CustomShape::Slab),
        "stairs" => Shape::Custom(CustomShape::Stairs),
        "sign" => Shape::Custom(CustomShape::Sign),
        "trapdoor" => Shape::Custom(CustomShape::Trapdoor { open }),
        "bed" => Shape::Custom(CustomShape::Bed),
        "door" => {
            let half = match half {
                Some("top") => DoorHalf::Top,
                _ => DoorHalf::Bottom,
            };
            Shape::Custom(CustomShape::Door { half, open })
        }
        "lily_pad" => Shape::Custom(CustomShape::LilyPad),
        other => {
            return Err(RegistryError::UnknownShape {
                block: block.to_string(),
                kind: other.to_string(),
            });
        }
    };
    Ok(shape)
}

fn resolve_tiles(def: Option<&TilesDef>) -> [Tile; 6] {
    let mut out = [Tile::default(); 6];
    let Some(def) = def else {
        return out;
    };
    let to_tile = |t: [u8; 2]| Tile::new(t[0], t[1]);
    for role in FaceRole::ALL {
        let explicit = match role {
            FaceRole::Left => def.left,
            FaceRole::Right => def.right,
            FaceRole::Bottom => def.bottom,
            FaceRole::Top => def.top,
            FaceRole::Back => def.back,
            FaceRole::Front => def.front,
        };
        let lateral = if role.is_lateral() { def.side } else { None };
        if let Some(t) = explicit.or(lateral).or(def.all) {
            out[role.index()] = to_tile(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_fall_back_explicit_then_side_then_all() {
        let def = TilesDef {
            all: Some([1, 1]),
            side: Some([2, 2]),
            top: Some([3, 3]),
            front: Some([4, 4]),
            ..TilesDef::default()
        };
        let tiles = resolve_tiles(Some(&def));
        assert_eq!(tiles[FaceRole::Top.index()], Tile::new(3, 3));
        assert_eq!(tiles[FaceRole::Front.index()], Tile::new(4, 4));
        assert_eq!(tiles[FaceRole::Left.index()], Tile::new(2, 2));
        assert_eq!(tiles[FaceRole::Bottom.index()], Tile::new(1, 1));
    }

    #[test]
    fn side_never_applies_to_top_or_bottom() {
        let def = TilesDef {
            side: Some([5, 0]),
            ..TilesDef::default()
        };
        let tiles = resolve_tiles(Some(&def));
        assert_eq!(tiles[FaceRole::Top.index()], Tile::default());
        assert_eq!(tiles[FaceRole::Back.index()], Tile::new(5, 0));
    }
}
