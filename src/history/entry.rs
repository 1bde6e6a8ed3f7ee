use crate::error::{GridError, Result};
use crate::schema::ColumnDef;
use crate::table::{Row, Table};
use crate::value::CellValue;

/// One cell's before/after values
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub row: usize,
    pub key: String,
    pub old: CellValue,
    pub new: CellValue,
}

/// Height a removed row had, and whether the user had pinned it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowLayout {
    pub height: f64,
    pub sticky: bool,
}

/// Represents a reversible mutation of the table.
/// Each variant carries everything needed to apply its inverse.
#[derive(Debug, Clone)]
pub enum HistoryEntry {
    CellBatch(Vec<CellChange>),
    /// Rows with their final indices, ascending. `layout` parallels `rows`
    /// when the rows come back from a delete and is empty for fresh rows.
    RowInsert { rows: Vec<(usize, Row)>, layout: Vec<RowLayout> },
    /// Rows with their original indices, ascending
    RowDelete { rows: Vec<(usize, Row)>, layout: Vec<RowLayout> },
    ColumnInsert { index: usize, column: ColumnDef, values: Vec<CellValue> },
    ColumnDelete { index: usize, column: ColumnDef, values: Vec<CellValue> },
}

impl HistoryEntry {
    pub fn is_empty(&self) -> bool {
        match self {
            HistoryEntry::CellBatch(changes) => changes.is_empty(),
            HistoryEntry::RowInsert { rows, .. } | HistoryEntry::RowDelete { rows, .. } => rows.is_empty(),
            HistoryEntry::ColumnInsert { .. } | HistoryEntry::ColumnDelete { .. } => false,
        }
    }

    /// Whether applying this changes the shape of the table
    pub fn is_structural(&self) -> bool {
        !matches!(self, HistoryEntry::CellBatch(_))
    }

    pub fn apply(&self, table: &mut Table) -> Result<()> {
        match self {
            HistoryEntry::CellBatch(changes) => {
                let mut touched: Vec<usize> = Vec::with_capacity(changes.len());
                for change in changes {
                    if change.row >= table.row_count() {
                        return Err(GridError::RowOutOfBounds { index: change.row, count: table.row_count() });
                    }
                    table
                        .set_value(change.row, &change.key, change.new.clone())
                        .ok_or_else(|| GridError::UnknownColumn(change.key.clone()))?;
                    touched.push(change.row);
                }
                touched.sort_unstable();
                touched.dedup();
                for row in touched {
                    table.recompute_disabled(row);
                }
            }
            HistoryEntry::RowInsert { rows, .. } => {
                for (idx, row) in rows {
                    table.insert_row_at(*idx, row.clone());
                }
            }
            HistoryEntry::RowDelete { rows, .. } => {
                // descending so earlier indices stay valid
                for (idx, _) in rows.iter().rev() {
                    let count = table.row_count();
                    table
                        .delete_row_at(*idx)
                        .ok_or(GridError::RowOutOfBounds { index: *idx, count })?;
                }
            }
            HistoryEntry::ColumnInsert { index, column, values } => {
                table.insert_column(*index, column.clone(), values.clone())?;
            }
            HistoryEntry::ColumnDelete { index, .. } => {
                table.remove_column(*index)?;
            }
        }
        Ok(())
    }

    pub fn inverse(&self) -> HistoryEntry {
        match self {
            HistoryEntry::CellBatch(changes) => HistoryEntry::CellBatch(
                changes
                    .iter()
                    .rev()
                    .map(|c| CellChange {
                        row: c.row,
                        key: c.key.clone(),
                        old: c.new.clone(),
                        new: c.old.clone(),
                    })
                    .collect(),
            ),
            HistoryEntry::RowInsert { rows, layout } => {
                HistoryEntry::RowDelete { rows: rows.clone(), layout: layout.clone() }
            }
            HistoryEntry::RowDelete { rows, layout } => {
                HistoryEntry::RowInsert { rows: rows.clone(), layout: layout.clone() }
            }
            HistoryEntry::ColumnInsert { index, column, values } => HistoryEntry::ColumnDelete {
                index: *index,
                column: column.clone(),
                values: values.clone(),
            },
            HistoryEntry::ColumnDelete { index, column, values } => HistoryEntry::ColumnInsert {
                index: *index,
                column: column.clone(),
                values: values.clone(),
            },
        }
    }
}
