use serde::Deserialize;

use crate::types::ToolKind;

// Top-level blocks definition file
#[derive(Deserialize, Debug, Clone, Default)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct BlockDef {
    pub id: u16,
    pub name: String,
    #[serde(default)]
    pub solid: Option<bool>,
    #[serde(default)]
    pub transparent: Option<bool>,
    #[serde(default)]
    pub fluid: Option<bool>,
    #[serde(default)]
    pub shape: Option<ShapeConfig>,
    #[serde(default)]
    pub tiles: Option<TilesDef>,
    #[serde(default)]
    pub hardness: Option<f32>,
    #[serde(default)]
    pub best_tool: Option<ToolKind>,
    #[serde(default)]
    pub food_restore: Option<u32>,
    #[serde(default)]
    pub tool: Option<ToolDef>,
}

// Shape is either a plain kind ("cube", "torch") or a table for variants with state
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ShapeConfig {
    Simple(String),
    Detailed(ShapeDetailed),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ShapeDetailed {
    pub kind: String,
    #[serde(default)]
    pub half: Option<String>,
    #[serde(default)]
    pub open: Option<bool>,
}

/// Tile coordinates per face semantic; lateral faces fall back to `side`, everything to `all`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct TilesDef {
    #[serde(default)]
    pub all: Option<[u8; 2]>,
    #[serde(default)]
    pub side: Option<[u8; 2]>,
    #[serde(default)]
    pub top: Option<[u8; 2]>,
    #[serde(default)]
    pub bottom: Option<[u8; 2]>,
    #[serde(default)]
    pub left: Option<[u8; 2]>,
    #[serde(default)]
    pub right: Option<[u8; 2]>,
    #[serde(default)]
    pub front: Option<[u8; 2]>,
    #[serde(default)]
    pub back: Option<[u8; 2]>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ToolDef {
    pub kind: ToolKind,
    #[serde(default)]
    pub tier: u32,
    #[serde(default = "default_tool_damage")]
    pub damage: f32,
    #[serde(default = "default_tool_durability")]
    pub durability: u32,
}

fn default_tool_damage() -> f32 {
    1.0
}

fn default_tool_durability() -> u32 {
    60
}
