use cubeworld_blocks::Tile;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_DEPTH_DIM_FACTOR, DEFAULT_DEPTH_DIM_MIN, DEFAULT_FLUID_SURFACE_DROP,
    DEFAULT_SKY_LEVEL, DEFAULT_TILE_PX, DEFAULT_TILES_PER_ROW,
};

/// Atlas layout and shading knobs for the mesher.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MeshSettings {
    #[serde(default = "default_tile_px")]
    pub tile_px: u32,
    #[serde(default = "default_tiles_per_row")]
    pub tiles_per_row: u32,
    /// Solids at or above this height never dim the voxels below them.
    #[serde(default = "default_sky_level")]
    pub sky_level: i32,
    #[serde(default = "default_depth_dim_factor")]
    pub depth_dim_factor: f32,
    #[serde(default = "default_depth_dim_min")]
    pub depth_dim_min: f32,
    #[serde(default = "default_fluid_surface_drop")]
    pub fluid_surface_drop: f32,
}

fn default_tile_px() -> u32 {
    DEFAULT_TILE_PX
}
fn default_tiles_per_row() -> u32 {
    DEFAULT_TILES_PER_ROW
}
fn default_sky_level() -> i32 {
    DEFAULT_SKY_LEVEL
}
fn default_depth_dim_factor() -> f32 {
    DEFAULT_DEPTH_DIM_FACTOR
}
fn default_depth_dim_min() -> f32 {
    DEFAULT_DEPTH_DIM_MIN
}
fn default_fluid_surface_drop() -> f32 {
    DEFAULT_FLUID_SURFACE_DROP
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            tile_px: default_tile_px(),
            tiles_per_row: default_tiles_per_row(),
            sky_level: default_sky_level(),
            depth_dim_factor: default_depth_dim_factor(),
            depth_dim_min: default_depth_dim_min(),
            fluid_surface_drop: default_fluid_surface_drop(),
        }
    }
}

impl MeshSettings {
    #[inline]
    pub fn atlas_px(&self) -> f32 {
        (self.tile_px.max(1) * self.tiles_per_row.max(1)) as f32
    }

    /// Atlas rect of `tile`, inset by half a texel on every side.
    pub fn tile_uv(&self, tile: Tile) -> UvRect {
        let atlas = self.atlas_px();
        let half = 0.5 / atlas;
        let step = self.tile_px.max(1) as f32 / atlas;
        let u0 = f32::from(tile.u) * step;
        let v0 = f32::from(tile.v) * step;
        UvRect {
            u0: u0 + half,
            v0: v0 + half,
            u1: u0 + step - half,
            v1: v0 + step - half,
        }
    }

    /// Shade for a voxel at world height `y` whose nearest solid above is at `ceiling`.
    #[inline]
    pub fn depth_dim(&self, y: i32, ceiling: Option<i32>) -> f32 {
        match ceiling {
            Some(c) if c < self.sky_level => {
                let dim = 1.0 - (self.sky_level - y) as f32 * self.depth_dim_factor;
                dim.clamp(self.depth_dim_min, 1.0)
            }
            _ => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    #[inline]
    pub fn lerp(&self, fu: f32, fv: f32) -> (f32, f32) {
        (
            self.u0 + (self.u1 - self.u0) * fu,
            self.v0 + (self.v1 - self.v0) * fv,
        )
    }
}
