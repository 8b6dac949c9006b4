//! Block registry: per-id properties, face tiles, shapes and the mining contract.
#![forbid(unsafe_code)]

pub mod config;
pub mod mining;
pub mod registry;
pub mod types;

pub use mining::{INSTANT_MINE_SPEED, MineSpeed, MiningProgress, mine_speed};
pub use registry::{BlockRegistry, RegistryError};
pub use types::{
    AIR, BlockId, BlockType, CustomShape, DoorHalf, FaceRole, Shape, Tile, ToolKind, ToolProps,
};
