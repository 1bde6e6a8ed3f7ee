use tracing::{debug, warn};

use super::Grid;
use crate::history::HistoryEntry;

impl Grid {
    /// Revert the most recent change. An open editor is cancelled first.
    pub fn undo(&mut self) -> bool {
        self.cancel_editor();
        let Some(inverse) = self.history.undo() else {
            return false;
        };
        debug!(structural = inverse.is_structural(), "undo");
        self.replay(&inverse)
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_editor();
        let Some(entry) = self.history.redo() else {
            return false;
        };
        debug!(structural = entry.is_structural(), "redo");
        self.replay(&entry)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run `f` with history recording suspended, e.g. for bulk loads the
    /// user should not be able to undo step by step
    pub fn without_history<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.history.suspend();
        let out = f(self);
        self.history.resume();
        out
    }

    /// Apply a stored entry without recording it again
    fn replay(&mut self, entry: &HistoryEntry) -> bool {
        self.history.suspend();
        let result = self.apply_entry(entry);
        self.history.resume();
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("failed to replay history entry: {}", e);
                false
            }
        }
    }
}
