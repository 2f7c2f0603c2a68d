//! Bounded linear undo/redo history of form snapshots
//!
//! Entries live in a ring buffer with a cursor. Entries before the cursor
//! hold the state each edit replaced; entries at or after it hold the state an
//! undo replaced, ready for redo. Undo and redo swap the live snapshot with
//! the entry at the cursor, so no snapshot is ever deep-copied here.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::form::FormData;

/// A form snapshot and the step it was edited on
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub snapshot: Arc<FormData>,
    pub step: u8,
}

#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    capacity: usize,
}

impl History {
    /// A capacity of zero disables history
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            cursor: 0,
            capacity,
        }
    }

    /// Record the state an edit is about to replace
    ///
    /// Drops every entry ahead of the cursor and evicts the oldest entry
    /// once the capacity is exceeded.
    pub fn record(&mut self, before: Arc<FormData>, step: u8) {
        if self.capacity == 0 {
            return;
        }

        self.entries.truncate(self.cursor);
        self.entries.push_back(HistoryEntry {
            snapshot: before,
            step,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
    }

    /// Swap `current` with the previous snapshot. Returns the step the
    /// restored data was edited on, or None when there is nothing to undo.
    pub fn undo(&mut self, current: &mut Arc<FormData>) -> Option<u8> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let entry = &mut self.entries[self.cursor];
        std::mem::swap(&mut entry.snapshot, current);
        Some(entry.step)
    }

    /// Swap `current` with the next undone snapshot
    pub fn redo(&mut self, current: &mut Arc<FormData>) -> Option<u8> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        let entry = &mut self.entries[self.cursor];
        std::mem::swap(&mut entry.snapshot, current);
        let step = entry.step;
        self.cursor += 1;
        Some(step)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
