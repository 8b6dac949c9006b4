use std::collections::HashMap;

use cubeworld_chunk::ColumnCoord;

use crate::journal::JournalEntry;

/// Mutations waiting for their column to be generated, kept in issue order.
#[derive(Clone, Debug, Default)]
pub struct PendingChanges {
    by_column: HashMap<ColumnCoord, Vec<JournalEntry>>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: JournalEntry) {
        self.by_column.entry(entry.column()).or_default().push(entry);
    }

    /// Removes and returns the column's entries in the order they were parked.
    pub fn take(&mut self, col: ColumnCoord) -> Vec<JournalEntry> {
        self.by_column.remove(&col).unwrap_or_default()
    }

    pub fn has(&self, col: ColumnCoord) -> bool {
        self.by_column.contains_key(&col)
    }

    pub fn columns(&self) -> impl Iterator<Item = ColumnCoord> + '_ {
        self.by_column.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_column.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_column.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_returns_issue_order_and_clears() {
        let mut p = PendingChanges::new();
        p.push(JournalEntry::new(1, 70, 1, 3));
        p.push(JournalEntry::new(40, 70, 1, 3));
        p.push(JournalEntry::new(1, 70, 1, 0));
        assert_eq!(p.len(), 3);
        assert!(p.has(ColumnCoord::new(1, 0)));
        let got = p.take(ColumnCoord::new(0, 0));
        assert_eq!(got.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 0]);
        assert!(!p.has(ColumnCoord::new(0, 0)));
        assert!(p.take(ColumnCoord::new(0, 0)).is_empty());
        assert_eq!(p.columns().count(), 1);
    }
}
