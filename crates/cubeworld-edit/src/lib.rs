//! Block-change journal, pending changes for ungenerated columns, and rebuild stamps.
#![forbid(unsafe_code)]

mod journal;
mod pending;

use std::collections::HashMap;

use cubeworld_chunk::ChunkCoord;

pub use journal::{BlockJournal, JournalEntry, JournalError};
pub use pending::PendingChanges;

/// Per-chunk change stamps: the latest requested change and the last stamp a
/// finished build reflected.
#[derive(Default, Debug)]
pub struct RevStamps {
    rev: HashMap<ChunkCoord, u64>,
    built: HashMap<ChunkCoord, u64>,
    counter: u64,
}

impl RevStamps {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_stamp(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(1).max(1);
        self.counter
    }

    /// Stamps a single chunk. Returns the new monotonically increasing stamp.
    pub fn bump(&mut self, coord: ChunkCoord) -> u64 {
        let stamp = self.next_stamp();
        self.rev.insert(coord, stamp);
        stamp
    }

    /// Gives every chunk in `coords` the same fresh stamp.
    pub fn bump_all(&mut self, coords: impl IntoIterator<Item = ChunkCoord>) -> u64 {
        let stamp = self.next_stamp();
        for coord in coords {
            self.rev.insert(coord, stamp);
        }
        stamp
    }

    pub fn get_rev(&self, coord: ChunkCoord) -> u64 {
        self.rev.get(&coord).copied().unwrap_or(0)
    }

    pub fn mark_built(&mut self, coord: ChunkCoord, rev: u64) {
        // Only update if this is a newer revision
        let e = self.built.entry(coord).or_insert(0);
        if rev > *e {
            *e = rev;
        }
    }

    pub fn needs_rebuild(&self, coord: ChunkCoord) -> bool {
        self.get_rev(coord) > self.get_built_rev(coord)
    }

    pub fn get_built_rev(&self, coord: ChunkCoord) -> u64 {
        self.built.get(&coord).copied().unwrap_or(0)
    }
}

/// The chunk containing a world voxel followed by its six face neighbors.
pub fn affected_chunks(wx: i32, wy: i32, wz: i32) -> [ChunkCoord; 7] {
    let c = ChunkCoord::containing(wx, wy, wz);
    let [a, b, d, e, f, g] = c.face_neighbors();
    [c, a, b, d, e, f, g]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_all_shares_one_stamp_across_an_edit_footprint() {
        let mut store = RevStamps::new();
        let (cx, cy, cz) = (4, 7, -2);
        let (wx, wy, wz) = (cx * 32 + 5, cy * 32 + 31, cz * 32 + 11);
        let stamp = store.bump_all(affected_chunks(wx, wy, wz));
        let center = ChunkCoord::new(cx, cy, cz);
        assert_eq!(store.get_rev(center), stamp);
        for n in center.face_neighbors() {
            assert_eq!(store.get_rev(n), stamp);
        }
        assert_eq!(store.get_rev(center.offset(1, 1, 0)), 0);

        let below = center.offset(0, -1, 0);
        let partial = store.bump_all([center, below]);
        assert_eq!(store.get_rev(below), partial);
        assert_eq!(store.get_rev(center.offset(0, 1, 0)), stamp);

        let later = store.bump(center);
        assert!(later > stamp);
        assert_eq!(store.get_rev(center.offset(0, 1, 0)), stamp);
    }

    #[test]
    fn built_stamps_only_move_forward() {
        let mut store = RevStamps::new();
        let c = ChunkCoord::new(0, 0, 0);
        let r1 = store.bump(c);
        let r2 = store.bump(c);
        assert!(store.needs_rebuild(c));
        store.mark_built(c, r2);
        store.mark_built(c, r1);
        assert_eq!(store.get_built_rev(c), r2);
        assert!(!store.needs_rebuild(c));
    }

    #[test]
    fn affected_chunks_start_with_the_owner() {
        let a = affected_chunks(-1, 0, 33);
        assert_eq!(a[0], ChunkCoord::new(-1, 0, 1));
        let mut uniq = a.to_vec();
        uniq.sort();
        uniq.dedup();
        assert_eq!(uniq.len(), 7);
    }
}
