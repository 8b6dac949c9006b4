use cubeworld_blocks::FaceRole;
use cubeworld_geom::Vec3;

use crate::constants::FACE_BRIGHTNESS;

/// Cube faces in `[-X, +X, -Y, +Y, -Z, +Z]` order; the index doubles as the
/// neighbor slot in `MeshInput::neighbors`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    NegX = 0,
    PosX = 1,
    NegY = 2,
    PosY = 3,
    NegZ = 4,
    PosZ = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    /// Returns the `[0..6)` index of this face.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the unit-normal vector for this face.
    #[inline]
    pub fn normal(self) -> Vec3 {
        let (dx, dy, dz) = self.delta();
        Vec3::new(dx as f32, dy as f32, dz as f32)
    }

    /// Returns the integer grid delta `(dx,dy,dz)` when stepping out of this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Face::NegX => (-1, 0, 0),
            Face::PosX => (1, 0, 0),
            Face::NegY => (0, -1, 0),
            Face::PosY => (0, 1, 0),
            Face::NegZ => (0, 0, -1),
            Face::PosZ => (0, 0, 1),
        }
    }

    /// Tile role used for atlas lookup.
    #[inline]
    pub fn role(self) -> FaceRole {
        match self {
            Face::NegX => FaceRole::Left,
            Face::PosX => FaceRole::Right,
            Face::NegY => FaceRole::Bottom,
            Face::PosY => FaceRole::Top,
            Face::NegZ => FaceRole::Back,
            Face::PosZ => FaceRole::Front,
        }
    }

    #[inline]
    pub fn brightness(self) -> f32 {
        FACE_BRIGHTNESS[self.index()]
    }
}

/// Horizontal neighbors used by connecting shapes (chests, fences).
pub const SIDE_FACES: [Face; 4] = [Face::NegX, Face::PosX, Face::NegZ, Face::PosZ];
