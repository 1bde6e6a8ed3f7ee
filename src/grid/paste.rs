//! Copy and paste with per-cell coercion.

use tracing::warn;

use super::{Grid, UpdateReport};
use crate::clipboard::{self, CopyBuffer};
use crate::coerce::matches_type;
use crate::schema::DataType;
use crate::selection::{CellPos, CellRange, Selection};
use crate::value::CellValue;

impl Grid {
    /// Capture the current selection into the copy buffer, replacing what was there
    pub fn copy(&mut self) -> bool {
        let (rows, cols) = (self.row_count(), self.col_count());
        let buffer = match self.selection.get().clone() {
            Selection::None => return false,
            Selection::Cell(pos) => {
                let (Some(value), Some(column)) = (self.value(pos), self.schema().column(pos.col)) else {
                    return false;
                };
                CopyBuffer::Cell { value, data_type: column.data_type, source: pos }
            }
            Selection::Range { range, .. } => {
                let Some(range) = range.clip(rows, cols) else {
                    return false;
                };
                self.capture(
                    (range.top()..=range.bottom()).collect(),
                    (range.left()..=range.right()).collect(),
                    range,
                )
            }
            Selection::Rows { rows: selected, .. } => {
                let (Some(&first), Some(&last)) = (selected.first(), selected.last()) else {
                    return false;
                };
                if cols == 0 {
                    return false;
                }
                let source = CellRange::new(CellPos::new(first, 0), CellPos::new(last, cols - 1));
                self.capture(selected.into_iter().collect(), (0..cols).collect(), source)
            }
            Selection::Column(col) => {
                if rows == 0 {
                    return false;
                }
                let source = CellRange::new(CellPos::new(0, col), CellPos::new(rows - 1, col));
                self.capture((0..rows).collect(), vec![col], source)
            }
        };
        self.copy = buffer;
        true
    }

    fn capture(&self, rows: Vec<usize>, cols: Vec<usize>, source: CellRange) -> CopyBuffer {
        let columns: Vec<(&str, DataType)> = cols
            .iter()
            .filter_map(|&c| self.schema().column(c))
            .map(|c| (c.key.as_str(), c.data_type))
            .collect();

        let values: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|&r| {
                let row = self.table.get_row(r);
                columns
                    .iter()
                    .map(|(key, _)| row.map(|row| row.value(key)).unwrap_or_default())
                    .collect()
            })
            .collect();

        let types: Vec<DataType> = columns.iter().map(|(_, t)| *t).collect();
        if types.windows(2).any(|w| w[0] != w[1]) {
            warn!("copied range spans columns of different types: {:?}", types);
        }
        let stray = values
            .iter()
            .flat_map(|row| row.iter().zip(&types))
            .filter(|(v, t)| !matches_type(**t, v))
            .count();
        if stray > 0 {
            warn!("{} copied cells do not match their column type", stray);
        }

        CopyBuffer::Range { values, types, source }
    }

    /// Paste the copy buffer into the current selection
    pub fn paste(&mut self) -> UpdateReport {
        let matrix = self.copy.matrix();
        self.paste_matrix(&matrix)
    }

    /// Paste tab-separated text, e.g. from another application
    pub fn paste_text(&mut self, text: &str) -> Result<UpdateReport, String> {
        let matrix: Vec<Vec<CellValue>> = clipboard::parse_tsv(text)?
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::Text).collect())
            .collect();
        Ok(self.paste_matrix(&matrix))
    }

    /// Copy the selection and put it on the system clipboard as TSV
    pub fn copy_to_system(&mut self) -> Result<(), String> {
        if !self.copy() {
            return Err("Nothing to copy".to_string());
        }
        let tsv = self.copy.to_tsv()?;
        clipboard::copy_to_system_clipboard(&tsv)
    }

    pub fn paste_from_system(&mut self) -> Result<UpdateReport, String> {
        let text = clipboard::paste_from_system_clipboard()?;
        if text.is_empty() {
            return Err("System clipboard is empty".to_string());
        }
        self.paste_text(&text)
    }

    /// Write `matrix` into the selection:
    /// a single cell anchors the block (clipped at the sheet edge), anything
    /// larger is tiled with the block by row/col modulo.
    fn paste_matrix(&mut self, matrix: &[Vec<CellValue>]) -> UpdateReport {
        let height = matrix.len();
        let width = matrix.first().map(|r| r.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return UpdateReport::default();
        }
        let (rows, cols) = self.paste_targets(height, width);

        let mut writes = Vec::with_capacity(rows.len() * cols.len());
        for (i, &r) in rows.iter().enumerate() {
            let src = &matrix[i % height];
            for (j, &c) in cols.iter().enumerate() {
                if let Some(value) = src.get(j % width) {
                    writes.push((r, c, value.clone()));
                }
            }
        }
        self.write_cells(writes, true)
    }

    fn paste_targets(&self, height: usize, width: usize) -> (Vec<usize>, Vec<usize>) {
        let (row_count, col_count) = (self.row_count(), self.col_count());
        match self.selection.get() {
            Selection::None => (Vec::new(), Vec::new()),
            Selection::Cell(pos) => (
                (pos.row..(pos.row + height).min(row_count)).collect(),
                (pos.col..(pos.col + width).min(col_count)).collect(),
            ),
            Selection::Range { range, .. } => match range.clip(row_count, col_count) {
                Some(r) => ((r.top()..=r.bottom()).collect(), (r.left()..=r.right()).collect()),
                None => (Vec::new(), Vec::new()),
            },
            Selection::Rows { rows, .. } => (rows.iter().copied().collect(), (0..col_count).collect()),
            Selection::Column(c) => ((0..row_count).collect(), vec![*c]),
        }
    }
}
