use cubeworld_geom::Vec3;

use crate::face::Face;
use crate::settings::UvRect;

/// One geometry stream: flat attribute arrays plus a `u32` index buffer.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct MeshBuild {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshBuild {
    /// Clears all arrays but retains capacity for reuse across frames.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.colors.clear();
        self.indices.clear();
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends a quad with explicit per-vertex UVs. Corners may come in either
    /// winding; they are reordered so the front face points along `n`.
    pub fn add_quad_uv(
        &mut self,
        a: Vec3,
        b: Vec3,
        c: Vec3,
        d: Vec3,
        n: Vec3,
        mut uvs: [(f32, f32); 4],
        rgb: [f32; 3],
    ) {
        let base = self.vertex_count() as u32;
        let mut vs = [a, b, c, d];
        let cross = (vs[1] - vs[0]).cross(vs[2] - vs[0]);
        if cross.dot(n) < 0.0 {
            vs.swap(1, 3);
            uvs.swap(1, 3);
        }
        for i in 0..4 {
            self.positions.extend_from_slice(&[vs[i].x, vs[i].y, vs[i].z]);
            self.normals.extend_from_slice(&[n.x, n.y, n.z]);
            self.uvs.extend_from_slice(&[uvs[i].0, uvs[i].1]);
            self.colors.extend_from_slice(&rgb);
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Emits one face of the axis-aligned box `[min, max]`. `uv` is the atlas
    /// rect for the whole voxel face; the box face samples the matching sub-rect
    /// so partial boxes keep texel density.
    pub fn add_box_face(&mut self, face: Face, min: Vec3, max: Vec3, cell: Vec3, uv: UvRect, rgb: [f32; 3]) {
        let n = face.normal();
        // (u, v) parameterization per face; v grows downward in the atlas
        let (a, b, c, d) = match face {
            Face::PosY => (
                Vec3::new(min.x, max.y, min.z),
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(min.x, max.y, max.z),
            ),
            Face::NegY => (
                Vec3::new(min.x, min.y, max.z),
                Vec3::new(max.x, min.y, max.z),
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(min.x, min.y, min.z),
            ),
            Face::PosX => (
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(max.x, min.y, max.z),
            ),
            Face::NegX => (
                Vec3::new(min.x, max.y, min.z),
                Vec3::new(min.x, max.y, max.z),
                Vec3::new(min.x, min.y, max.z),
                Vec3::new(min.x, min.y, min.z),
            ),
            Face::PosZ => (
                Vec3::new(min.x, max.y, max.z),
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(max.x, min.y, max.z),
                Vec3::new(min.x, min.y, max.z),
            ),
            Face::NegZ => (
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(min.x, max.y, min.z),
                Vec3::new(min.x, min.y, min.z),
                Vec3::new(max.x, min.y, min.z),
            ),
        };
        // Fractions of the voxel cell covered by each corner, mapped into the tile
        let frac = |p: Vec3| -> (f32, f32) {
            let l = p - cell;
            match face {
                Face::PosY => (l.x, l.z),
                Face::NegY => (l.x, 1.0 - l.z),
                Face::PosX => (1.0 - l.z, 1.0 - l.y),
                Face::NegX => (l.z, 1.0 - l.y),
                Face::PosZ => (l.x, 1.0 - l.y),
                Face::NegZ => (1.0 - l.x, 1.0 - l.y),
            }
        };
        let uvs = [a, b, c, d].map(|p| {
            let (fu, fv) = frac(p);
            uv.lerp(fu.clamp(0.0, 1.0), fv.clamp(0.0, 1.0))
        });
        self.add_quad_uv(a, b, c, d, n, uvs, rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_uv() -> UvRect {
        UvRect {
            u0: 0.0,
            v0: 0.0,
            u1: 1.0,
            v1: 1.0,
        }
    }

    #[test]
    fn quad_winding_faces_normal() {
        for face in Face::ALL {
            let mut mb = MeshBuild::default();
            mb.add_box_face(face, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, unit_uv(), [1.0; 3]);
            let p = |i: u32| {
                let i = i as usize * 3;
                Vec3::new(mb.positions[i], mb.positions[i + 1], mb.positions[i + 2])
            };
            let (a, b, c) = (p(mb.indices[0]), p(mb.indices[1]), p(mb.indices[2]));
            assert!((b - a).cross(c - a).dot(face.normal()) > 0.0, "{face:?}");
        }
    }

    #[test]
    fn side_faces_map_top_edge_to_v0() {
        let mut mb = MeshBuild::default();
        mb.add_box_face(Face::PosZ, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, unit_uv(), [1.0; 3]);
        for v in 0..4 {
            let y = mb.positions[v * 3 + 1];
            let tv = mb.uvs[v * 2 + 1];
            assert_eq!(tv, 1.0 - y);
        }
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut mb = MeshBuild::default();
        mb.add_box_face(Face::PosY, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, unit_uv(), [1.0; 3]);
        let cap = mb.positions.capacity();
        mb.clear_keep_capacity();
        assert!(mb.is_empty());
        assert_eq!(mb.positions.capacity(), cap);
    }
}
