use cubeworld_geom::Vec3;

use crate::chunk::{ChunkMeshCPU, MeshStream};
use crate::face::Face;
use crate::mesh_build::MeshBuild;
use crate::settings::UvRect;

/// Stream-addressed access to the buffers being filled.
pub(crate) trait BuildSink {
    fn get_build_mut(&mut self, stream: MeshStream) -> &mut MeshBuild;
}

impl BuildSink for ChunkMeshCPU {
    #[inline]
    fn get_build_mut(&mut self, stream: MeshStream) -> &mut MeshBuild {
        match stream {
            MeshStream::Opaque => &mut self.opaque,
            MeshStream::Transparent => &mut self.transparent,
        }
    }
}

/// Emits up to six faces of an axis-aligned box using a chooser to pick UVs and color.
#[inline]
pub(crate) fn emit_box_faces(
    builds: &mut impl BuildSink,
    stream: MeshStream,
    min: Vec3,
    max: Vec3,
    cell: Vec3,
    mut choose: impl FnMut(Face) -> Option<(UvRect, [f32; 3])>,
) {
    for face in Face::ALL {
        if let Some((uv, rgb)) = choose(face) {
            builds
                .get_build_mut(stream)
                .add_box_face(face, min, max, cell, uv, rgb);
        }
    }
}

/// Two diagonal quads through the cell, each emitted for both sides.
pub(crate) fn emit_cross(
    builds: &mut impl BuildSink,
    stream: MeshStream,
    cell: Vec3,
    uv: UvRect,
    rgb: [f32; 3],
) {
    let inv_sqrt2 = std::f32::consts::FRAC_1_SQRT_2;
    let uvs = [(uv.u0, uv.v0), (uv.u1, uv.v0), (uv.u1, uv.v1), (uv.u0, uv.v1)];
    let diagonals = [
        (
            [
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 0.0),
            ],
            Vec3::new(inv_sqrt2, 0.0, -inv_sqrt2),
        ),
        (
            [
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
            Vec3::new(inv_sqrt2, 0.0, inv_sqrt2),
        ),
    ];
    let mb = builds.get_build_mut(stream);
    for (corners, n) in diagonals {
        let [a, b, c, d] = corners.map(|p| p + cell);
        mb.add_quad_uv(a, b, c, d, n, uvs, rgb);
        mb.add_quad_uv(a, b, c, d, -n, uvs, rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubeworld_chunk::ChunkCoord;

    #[test]
    fn cross_emits_eight_triangles_facing_both_ways() {
        let mut mesh = ChunkMeshCPU::empty(ChunkCoord::new(0, 0, 0));
        let uv = UvRect {
            u0: 0.0,
            v0: 0.0,
            u1: 1.0,
            v1: 1.0,
        };
        emit_cross(&mut mesh, MeshStream::Transparent, Vec3::ZERO, uv, [1.0; 3]);
        assert_eq!(mesh.transparent.triangle_count(), 8);
        assert!(mesh.opaque.is_empty());
        let n0 = &mesh.transparent.normals[0..3];
        let n1 = &mesh.transparent.normals[12..15];
        assert_eq!(n0[0], -n1[0]);
    }
}
