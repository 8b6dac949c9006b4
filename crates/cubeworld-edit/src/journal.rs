use std::collections::HashMap;

use cubeworld_blocks::BlockId;
use cubeworld_chunk::{ChunkCoord, ColumnCoord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JournalEntry {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub id: BlockId,
}

impl JournalEntry {
    #[inline]
    pub fn new(x: i32, y: i32, z: i32, id: BlockId) -> Self {
        Self { x, y, z, id }
    }

    #[inline]
    pub fn column(&self) -> ColumnCoord {
        ColumnCoord::containing(self.x, self.z)
    }

    #[inline]
    pub fn chunk(&self) -> ChunkCoord {
        ChunkCoord::containing(self.x, self.y, self.z)
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
    #[error("journal is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Serialize, Deserialize, Default)]
struct JournalFile {
    #[serde(default)]
    entries: Vec<JournalEntry>,
}

/// Latest block id for every voxel changed by a mutation, grouped by column.
#[derive(Clone, Debug, Default)]
pub struct BlockJournal {
    inner: HashMap<ColumnCoord, HashMap<(i32, i32, i32), BlockId>>,
}

impl BlockJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        self.inner
            .get(&ColumnCoord::containing(x, z))
            .and_then(|m| m.get(&(x, y, z)).copied())
    }

    /// Records the voxel's new id, replacing any earlier entry for it.
    pub fn record(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        self.inner
            .entry(ColumnCoord::containing(x, z))
            .or_default()
            .insert((x, y, z), id);
    }

    pub fn len(&self) -> usize {
        self.inner.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.values().all(|m| m.is_empty())
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Entries of one column ordered by `(y, z, x)`.
    pub fn entries_for_column(&self, col: ColumnCoord) -> Vec<JournalEntry> {
        let mut out: Vec<JournalEntry> = self
            .inner
            .get(&col)
            .map(|m| m.iter().map(|(&(x, y, z), &id)| JournalEntry::new(x, y, z, id)).collect())
            .unwrap_or_default();
        out.sort_by_key(|e| (e.y, e.z, e.x));
        out
    }

    pub fn entries_in_chunk(&self, coord: ChunkCoord) -> Vec<JournalEntry> {
        let mut out = self.entries_for_column(coord.column());
        out.retain(|e| e.chunk() == coord);
        out
    }

    /// Every entry, ordered by column then position.
    pub fn entries(&self) -> Vec<JournalEntry> {
        let mut cols: Vec<ColumnCoord> = self.inner.keys().copied().collect();
        cols.sort();
        cols.into_iter()
            .flat_map(|c| self.entries_for_column(c))
            .collect()
    }

    pub fn to_toml_string(&self) -> Result<String, JournalError> {
        let file = JournalFile {
            entries: self.entries(),
        };
        Ok(toml::to_string(&file)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, JournalError> {
        let file: JournalFile = toml::from_str(text)?;
        let mut journal = BlockJournal::new();
        for e in file.entries {
            journal.record(e.x, e.y, e.z, e.id);
        }
        Ok(journal)
    }

    /// Persistence blob: UTF-8 TOML.
    pub fn to_bytes(&self) -> Result<Vec<u8>, JournalError> {
        Ok(self.to_toml_string()?.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, JournalError> {
        let text = String::from_utf8(bytes.to_vec())?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn later_records_replace_earlier_ones() {
        let mut j = BlockJournal::new();
        j.record(1, 2, 3, 5);
        j.record(1, 2, 3, 0);
        j.record(-40, 2, 3, 4);
        assert_eq!(j.len(), 2);
        assert_eq!(j.get(1, 2, 3), Some(0));
        assert_eq!(j.get(9, 9, 9), None);
        assert_eq!(j.entries_for_column(ColumnCoord::new(-2, 0)).len(), 1);
        assert!(j.entries_for_column(ColumnCoord::new(5, 5)).is_empty());
    }

    #[test]
    fn chunk_view_filters_by_height() {
        let mut j = BlockJournal::new();
        j.record(0, 5, 0, 3);
        j.record(0, 40, 0, 3);
        let low = j.entries_in_chunk(ChunkCoord::new(0, 0, 0));
        assert_eq!(low, vec![JournalEntry::new(0, 5, 0, 3)]);
        assert_eq!(j.entries_for_column(ColumnCoord::new(0, 0)).len(), 2);
    }

    #[test]
    fn empty_journal_serializes() {
        let j = BlockJournal::new();
        let back = BlockJournal::from_bytes(&j.to_bytes().unwrap()).unwrap();
        assert!(back.is_empty());
        assert!(BlockJournal::from_toml_str("entries = 3").is_err());
    }

    proptest! {
        #[test]
        fn bytes_restore_every_entry(
            edits in proptest::collection::vec((-200i32..200, -32i32..192, -200i32..200, any::<u8>()), 0..40)
        ) {
            let mut j = BlockJournal::new();
            for (x, y, z, id) in &edits {
                j.record(*x, *y, *z, *id);
            }
            let back = BlockJournal::from_bytes(&j.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(back.entries(), j.entries());
        }
    }
}
