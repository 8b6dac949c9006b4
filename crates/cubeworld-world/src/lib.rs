//! Sparse voxel store, deterministic terrain generation and worldgen parameters.
#![forbid(unsafe_code)]

pub mod generation;
pub mod world;
pub mod worldgen;

pub use generation::{ColumnInfo, GeneratedColumn, TerrainGenerator, TreeSite, WorldSeed, fnv1a32};
pub use world::{SetVoxel, World, WorldError};
pub use worldgen::{WorldGenConfig, WorldGenError};
