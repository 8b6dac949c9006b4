//! Shared constants for cubeworld-mesh-cpu. Centralizes common magic numbers.

/// Per-face shade for `[-X, +X, -Y, +Y, -Z, +Z]`.
pub const FACE_BRIGHTNESS: [f32; 6] = [0.8, 0.8, 0.6, 1.0, 0.7, 0.9];

// Cross plants are lit like a top face
pub(crate) const CROSS_BRIGHTNESS: f32 = 1.0;

// Custom shapes are authored on a 16-step grid per voxel
pub(crate) const SUBVOXEL_STEPS: f32 = 16.0;

// Shading defaults
pub(crate) const DEFAULT_SKY_LEVEL: i32 = 80;
pub(crate) const DEFAULT_DEPTH_DIM_FACTOR: f32 = 0.015;
pub(crate) const DEFAULT_DEPTH_DIM_MIN: f32 = 0.25;
pub(crate) const DEFAULT_FLUID_SURFACE_DROP: f32 = 0.15;

// Atlas layout defaults
pub(crate) const DEFAULT_TILE_PX: u32 = 16;
pub(crate) const DEFAULT_TILES_PER_ROW: u32 = 16;
