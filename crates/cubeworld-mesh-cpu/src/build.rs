use cubeworld_blocks::{AIR, BlockId, BlockRegistry, BlockType, CustomShape, FaceRole, Shape};
use cubeworld_chunk::{CHUNK_SIZE, CHUNK_VOLUME, ChunkBuf, voxel_index};
use cubeworld_geom::Vec3;

use crate::chunk::{ChunkMeshCPU, MeshStream};
use crate::constants::{CROSS_BRIGHTNESS, SUBVOXEL_STEPS};
use crate::emit::{emit_box_faces, emit_cross};
use crate::face::{Face, SIDE_FACES};
use crate::neighbors::MeshInput;
use crate::settings::MeshSettings;
use crate::shapes::{Connections, custom_boxes};

const S: usize = CHUNK_SIZE;

/// Naive per-voxel mesher with neighbor-aware face culling.
///
/// Voxels are visited in `(y, z, x)` order. A missing center chunk yields empty streams.
pub fn build_chunk_mesh(input: &MeshInput, reg: &BlockRegistry, settings: &MeshSettings) -> ChunkMeshCPU {
    let mut out = ChunkMeshCPU::empty(input.coord);
    let Some(center) = input.center.as_ref() else {
        return out;
    };
    if center.is_all_air() {
        return out;
    }
    let ceilings = next_solid_table(input, center, reg);
    let (_, oy, _) = input.coord.origin();
    let mut mesher = VoxelMesher {
        input,
        reg,
        settings,
        out: &mut out,
    };
    for ly in 0..S {
        for lz in 0..S {
            for lx in 0..S {
                let v = center.get_local(lx, ly, lz);
                if v == AIR {
                    continue;
                }
                let dim = settings.depth_dim(oy + ly as i32, ceilings[voxel_index(lx, ly, lz)]);
                mesher.voxel(lx as i32, ly as i32, lz as i32, v, dim);
            }
        }
    }
    out.has_transparency = !out.transparent.is_empty();
    log::trace!(
        target: "mesh",
        "chunk {} tris opaque={} transparent={}",
        input.coord,
        out.opaque.triangle_count(),
        out.transparent.triangle_count()
    );
    out
}

/// For every voxel, the world y of the nearest solid strictly above it, looking
/// through this chunk, the `+Y` neighbor, then the precomputed ceiling.
fn next_solid_table(input: &MeshInput, center: &ChunkBuf, reg: &BlockRegistry) -> Vec<Option<i32>> {
    let (_, oy, _) = input.coord.origin();
    let s = S as i32;
    let upper = input.neighbors[Face::PosY.index()].as_ref();
    let mut table = vec![None; CHUNK_VOLUME];
    for lz in 0..S {
        for lx in 0..S {
            let mut above = upper
                .and_then(|buf| (0..S).find(|&uy| reg.is_solid(buf.get_local(lx, uy, lz))))
                .map(|uy| oy + s + uy as i32)
                .or_else(|| input.ceiling_at(lx, lz));
            for ly in (0..S).rev() {
                table[voxel_index(lx, ly, lz)] = above;
                if reg.is_solid(center.get_local(lx, ly, lz)) {
                    above = Some(oy + ly as i32);
                }
            }
        }
    }
    table
}

struct VoxelMesher<'a> {
    input: &'a MeshInput,
    reg: &'a BlockRegistry,
    settings: &'a MeshSettings,
    out: &'a mut ChunkMeshCPU,
}

impl VoxelMesher<'_> {
    #[inline]
    fn neighbor(&self, x: i32, y: i32, z: i32, face: Face) -> BlockId {
        let (dx, dy, dz) = face.delta();
        self.input.voxel(x + dx, y + dy, z + dz)
    }

    fn voxel(&mut self, x: i32, y: i32, z: i32, v: BlockId, dim: f32) {
        let reg = self.reg;
        let ty = reg.get(v);
        let stream = if ty.transparent {
            MeshStream::Transparent
        } else {
            MeshStream::Opaque
        };
        let cell = Vec3::new(x as f32, y as f32, z as f32);
        match ty.shape {
            Shape::None => {}
            Shape::Cross => {
                let uv = self.settings.tile_uv(ty.tile(FaceRole::Front));
                let shade = CROSS_BRIGHTNESS * dim;
                emit_cross(self.out, stream, cell, uv, [shade; 3]);
            }
            Shape::Custom(kind) => self.custom(ty, kind, x, y, z, cell, stream, dim),
            Shape::Cube => self.cube(ty, x, y, z, cell, stream, dim),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn cube(&mut self, ty: &BlockType, x: i32, y: i32, z: i32, cell: Vec3, stream: MeshStream, dim: f32) {
        let v = ty.id;
        let neighbors = Face::ALL.map(|f| self.neighbor(x, y, z, f));
        let (reg, settings) = (self.reg, self.settings);
        // Only an open fluid surface sinks; under a solid block the sides stay full height.
        let above = neighbors[Face::PosY.index()];
        let mut max = cell + Vec3::ONE;
        if ty.fluid && above != v && !reg.is_solid(above) {
            max.y -= settings.fluid_surface_drop;
        }
        emit_box_faces(self.out, stream, cell, max, cell, |face| {
            let n = neighbors[face.index()];
            let visible = reg.is_transparent(n) && !(ty.transparent && v == n);
            if !visible {
                return None;
            }
            let uv = settings.tile_uv(ty.tile(face.role()));
            let shade = face.brightness() * dim;
            Some((uv, [shade; 3]))
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn custom(
        &mut self,
        ty: &BlockType,
        kind: CustomShape,
        x: i32,
        y: i32,
        z: i32,
        cell: Vec3,
        stream: MeshStream,
        dim: f32,
    ) {
        let links = self.connections(kind, x, y, z);
        let neighbors = Face::ALL.map(|f| self.neighbor(x, y, z, f));
        let (reg, settings) = (self.reg, self.settings);
        let step = 1.0 / SUBVOXEL_STEPS;
        for b in custom_boxes(kind, links) {
            let min = cell + Vec3::new(b.min[0] as f32, b.min[1] as f32, b.min[2] as f32) * step;
            let max = cell + Vec3::new(b.max[0] as f32, b.max[1] as f32, b.max[2] as f32) * step;
            emit_box_faces(self.out, stream, min, max, cell, |face| {
                if b.hidden.contains(face) {
                    return None;
                }
                let on_edge = match face {
                    Face::NegX => b.min[0] == 0,
                    Face::PosX => b.max[0] == 16,
                    Face::NegY => b.min[1] == 0,
                    Face::PosY => b.max[1] == 16,
                    Face::NegZ => b.min[2] == 0,
                    Face::PosZ => b.max[2] == 16,
                };
                if on_edge && !reg.is_transparent(neighbors[face.index()]) {
                    return None;
                }
                let uv = settings.tile_uv(ty.tile(face.role()));
                let shade = face.brightness() * dim;
                Some((uv, [shade; 3]))
            });
        }
    }

    /// Side neighbors a connecting shape joins: chests pair with chests in the
    /// same open/closed state, fences with fences.
    fn connections(&self, kind: CustomShape, x: i32, y: i32, z: i32) -> Connections {
        if !kind.is_chest() && kind != CustomShape::Fence {
            return Connections::default();
        }
        let joins = |face: Face| self.reg.shape(self.neighbor(x, y, z, face)) == Shape::Custom(kind);
        let [neg_x, pos_x, neg_z, pos_z] = SIDE_FACES.map(joins);
        Connections {
            neg_x,
            pos_x,
            neg_z,
            pos_z,
        }
    }
}
