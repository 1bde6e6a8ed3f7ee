use crate::editor::EditorKind;
use crate::schema::RowValues;
use crate::selection::CellPos;
use crate::table::Row;

/// Where a context menu was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextTarget {
    RowHeader(usize),
    ColumnHeader(usize),
    Cell(CellPos),
}

/// Notifications for the embedding application, drained with `Grid::drain_events`
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// One row's cells changed. `previous` holds prior values for `keys` only.
    CellsUpdated {
        row: usize,
        keys: Vec<String>,
        snapshot: RowValues,
        previous: RowValues,
    },
    RowsInserted { indices: Vec<usize> },
    RowDeleted { index: usize, row: Row },
    ColumnInserted { key: String, index: usize },
    ColumnDeleted { key: String, index: usize },
    CellSelected { row: usize, col: usize },
    ContextMenu { target: ContextTarget, x: f64, y: f64 },
    EditorOpened { pos: CellPos, kind: EditorKind },
    EditorClosed { pos: CellPos, committed: bool },
}
