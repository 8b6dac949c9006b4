use serde::{Deserialize, Serialize};

/// One voxel: an 8-bit block id. Id 0 is air.
pub type BlockId = u8;

pub const AIR: BlockId = 0;
pub const BLOCK_ID_COUNT: usize = 256;

/// Atlas tile coordinate in tile units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub u: u8,
    pub v: u8,
}

impl Tile {
    #[inline]
    pub const fn new(u: u8, v: u8) -> Self {
        Self { u, v }
    }
}

/// Concrete face of a unit cube, indexed in `[-X, +X, -Y, +Y, -Z, +Z]` order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FaceRole {
    Left = 0,
    Right = 1,
    Bottom = 2,
    Top = 3,
    Back = 4,
    Front = 5,
}

impl FaceRole {
    pub const ALL: [FaceRole; 6] = [
        FaceRole::Left,
        FaceRole::Right,
        FaceRole::Bottom,
        FaceRole::Top,
        FaceRole::Back,
        FaceRole::Front,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_lateral(self) -> bool {
        !matches!(self, FaceRole::Top | FaceRole::Bottom)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DoorHalf {
    Bottom,
    Top,
}

/// Blocks meshed from fixed sub-boxes instead of a full cube.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CustomShape {
    Torch,
    Lantern,
    Cactus,
    ChestClosed,
    ChestOpen,
    Fence,
    Ladder,
    Slab,
    Stairs,
    Sign,
    Trapdoor { open: bool },
    Bed,
    Door { half: DoorHalf, open: bool },
    LilyPad,
}

impl CustomShape {
    /// Chests pair with a horizontal neighbor of the same open/closed state.
    #[inline]
    pub fn is_chest(self) -> bool {
        matches!(self, CustomShape::ChestClosed | CustomShape::ChestOpen)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Shape {
    /// Not rendered (air, held items).
    None,
    Cube,
    /// Two crossed double-sided quads.
    Cross,
    Custom(CustomShape),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Pickaxe,
    Axe,
    Shovel,
    Sword,
    Shears,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ToolProps {
    pub kind: ToolKind,
    pub tier: u32,
    pub damage: f32,
    pub durability: u32,
}

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub registered: bool,
    pub solid: bool,
    pub transparent: bool,
    pub fluid: bool,
    pub shape: Shape,
    /// Resolved tile per face, indexed by `FaceRole::index`.
    pub tiles: [Tile; 6],
    /// `-1` unbreakable, `0` instant, otherwise base seconds.
    pub hardness: f32,
    pub best_tool: Option<ToolKind>,
    pub food_restore: Option<u32>,
    pub tool: Option<ToolProps>,
}

impl BlockType {
    /// Sentinel for ids with no registry entry: an opaque stone-like cube on tile `(0,0)`.
    pub fn unregistered(id: BlockId) -> Self {
        Self {
            id,
            name: String::new(),
            registered: false,
            solid: true,
            transparent: false,
            fluid: false,
            shape: Shape::Cube,
            tiles: [Tile::default(); 6],
            hardness: 1.5,
            best_tool: None,
            food_restore: None,
            tool: None,
        }
    }

    #[inline]
    pub fn tile(&self, role: FaceRole) -> Tile {
        self.tiles[role.index()]
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.id == AIR
    }
}
