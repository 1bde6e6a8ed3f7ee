//! Undo/redo history over invertible entries.

pub mod entry;

#[cfg(test)]
mod test;

pub use entry::{CellChange, HistoryEntry, RowLayout};

use std::collections::VecDeque;

use tracing::debug;

/// Manages undo/redo history with bounded stacks
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    capacity: usize,
    /// Nesting depth of replays and non-recording batches
    suspended: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
            suspended: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_recording(&self) -> bool {
        self.suspended == 0
    }

    pub fn suspend(&mut self) {
        self.suspended += 1;
    }

    pub fn resume(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
    }

    /// Record an entry (clears redo stack). Returns false if nothing was recorded.
    pub fn record(&mut self, entry: HistoryEntry) -> bool {
        if !self.is_recording() || entry.is_empty() {
            return false;
        }
        self.undo_stack.push_back(entry);
        if self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
            debug!("history full, evicted oldest entry");
        }
        self.redo_stack.clear();
        true
    }

    /// Undo the last entry, returns the inverse for application
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop_back()?;
        let inverse = entry.inverse();
        Self::push_bounded(&mut self.redo_stack, entry, self.capacity);
        Some(inverse)
    }

    /// Redo the last undone entry
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop_back()?;
        Self::push_bounded(&mut self.undo_stack, entry.clone(), self.capacity);
        Some(entry)
    }

    fn push_bounded(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, capacity: usize) {
        stack.push_back(entry);
        if stack.len() > capacity {
            stack.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
