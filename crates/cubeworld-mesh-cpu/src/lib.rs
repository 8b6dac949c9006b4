//! CPU meshing crate: per-voxel face-culled mesher and its helpers.
#![forbid(unsafe_code)]

mod build;
pub mod chunk;
pub mod constants;
mod emit;
pub mod face;
pub mod mesh_build;
pub mod neighbors;
pub mod settings;
pub mod shapes;

pub use build::build_chunk_mesh;
pub use chunk::{ChunkMeshCPU, MeshStream, chunk_bounds};
pub use constants::FACE_BRIGHTNESS;
pub use face::{Face, SIDE_FACES};
pub use mesh_build::MeshBuild;
pub use neighbors::MeshInput;
pub use settings::{MeshSettings, UvRect};
pub use shapes::{Connections, FaceMask, SubBox, custom_boxes};
