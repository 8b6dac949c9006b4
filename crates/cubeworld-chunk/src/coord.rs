use serde::{Deserialize, Serialize};

use crate::CHUNK_SIZE;

const S: i32 = CHUNK_SIZE as i32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    /// Chunk holding world voxel `(x, y, z)`, by floor division.
    #[inline]
    pub fn containing(x: i32, y: i32, z: i32) -> Self {
        Self::new(x.div_euclid(S), y.div_euclid(S), z.div_euclid(S))
    }

    #[inline]
    pub fn with_y(self, cy: i32) -> Self {
        Self { cy, ..self }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn column(self) -> ColumnCoord {
        ColumnCoord::new(self.cx, self.cz)
    }

    /// World coordinate of local voxel `(0,0,0)`.
    #[inline]
    pub fn origin(self) -> (i32, i32, i32) {
        (self.cx * S, self.cy * S, self.cz * S)
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }

    /// The six face-adjacent chunks in `[-X, +X, -Y, +Y, -Z, +Z]` order.
    #[inline]
    pub fn face_neighbors(self) -> [ChunkCoord; 6] {
        [
            self.offset(-1, 0, 0),
            self.offset(1, 0, 0),
            self.offset(0, -1, 0),
            self.offset(0, 1, 0),
            self.offset(0, 0, -1),
            self.offset(0, 0, 1),
        ]
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.cx, self.cy, self.cz)
    }
}

/// Vertical stack of chunks sharing `(cx, cz)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ColumnCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn containing(x: i32, z: i32) -> Self {
        Self::new(x.div_euclid(S), z.div_euclid(S))
    }

    #[inline]
    pub fn chunk(self, cy: i32) -> ChunkCoord {
        ChunkCoord::new(self.cx, cy, self.cz)
    }

    #[inline]
    pub fn distance_sq(self, other: ColumnCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }
}

/// Floor-modulo offsets of a world voxel inside its chunk; always in `[0, S)`.
#[inline]
pub fn local_of(x: i32, y: i32, z: i32) -> (usize, usize, usize) {
    (
        x.rem_euclid(S) as usize,
        y.rem_euclid(S) as usize,
        z.rem_euclid(S) as usize,
    )
}

/// Inverse of `ChunkCoord::containing` + `local_of`.
#[inline]
pub fn world_of(coord: ChunkCoord, lx: usize, ly: usize, lz: usize) -> (i32, i32, i32) {
    let (ox, oy, oz) = coord.origin();
    (ox + lx as i32, oy + ly as i32, oz + lz as i32)
}
