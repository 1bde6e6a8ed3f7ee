//! Pointer and keyboard driven selection, resizing and drag-fill.

use tracing::debug;

use super::{Drag, Grid, UpdateReport};
use crate::coerce::matches_type;
use crate::dimension::HitTarget;
use crate::event::{ContextTarget, GridEvent};
use crate::selection::{CellPos, Selection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { ctrl: false, shift: false };
    pub const CTRL: Modifiers = Modifiers { ctrl: true, shift: false };
    pub const SHIFT: Modifiers = Modifiers { ctrl: false, shift: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Column,
    Row,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResizeDrag {
    axis: Axis,
    index: usize,
    /// Pointer coordinate when the drag started
    start: f64,
    original: f64,
    was_sticky: bool,
}

impl Grid {
    pub(crate) fn emit_selected(&mut self, pos: CellPos) {
        self.events.push(GridEvent::CellSelected { row: pos.row, col: pos.col });
    }

    pub(crate) fn in_bounds(&self, pos: CellPos) -> bool {
        pos.row < self.row_count() && pos.col < self.col_count()
    }

    /// Commit an open editor unless it already targets `pos`
    fn leave_editor_for(&mut self, pos: Option<CellPos>) {
        let target = self.editor.target().map(|t| t.pos);
        if target.is_some() && target != pos {
            self.commit_editor();
        }
    }

    // === Cell selection ===

    /// Click a cell; shift extends a range from the active cell
    pub fn click_cell(&mut self, pos: CellPos, mods: Modifiers) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.leave_editor_for(Some(pos));
        let dirty = if mods.shift {
            self.selection.extend_range(pos)
        } else {
            self.selection.select_cell(pos)
        };
        if dirty {
            self.emit_selected(pos);
        }
        dirty
    }

    pub fn begin_range_drag(&mut self, pos: CellPos) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let dirty = self.click_cell(pos, Modifiers::NONE);
        self.drag = Some(Drag::Range { anchor: pos });
        dirty
    }

    pub fn update_range_drag(&mut self, pos: CellPos) -> bool {
        match self.drag {
            Some(Drag::Range { anchor }) if self.in_bounds(pos) => self.selection.select_range(anchor, pos),
            _ => false,
        }
    }

    pub fn end_range_drag(&mut self) {
        if matches!(self.drag, Some(Drag::Range { .. })) {
            self.drag = None;
        }
    }

    /// Move the active cell one step, or grow the range with `extend`
    pub fn move_active(&mut self, dir: Direction, extend: bool) -> bool {
        let (rows, cols) = (self.row_count(), self.col_count());
        if rows == 0 || cols == 0 {
            return false;
        }
        let current = self.selection.get().clone();
        let from = match (&current, extend) {
            (Selection::Range { range, .. }, true) => range.end,
            (sel, _) => match sel.active_cell() {
                Some(pos) => pos,
                None => return self.click_cell(CellPos::new(0, 0), Modifiers::NONE),
            },
        };
        let to = match dir {
            Direction::Up => CellPos::new(from.row.saturating_sub(1), from.col),
            Direction::Down => CellPos::new((from.row + 1).min(rows - 1), from.col),
            Direction::Left => CellPos::new(from.row, from.col.saturating_sub(1)),
            Direction::Right => CellPos::new(from.row, (from.col + 1).min(cols - 1)),
        };
        if extend {
            self.selection.extend_range(to)
        } else {
            self.click_cell(to, Modifiers::NONE)
        }
    }

    // === Headers ===

    /// Plain click selects the row, ctrl toggles it, shift spans from the anchor
    pub fn click_row_header(&mut self, row: usize, mods: Modifiers) -> bool {
        if row >= self.row_count() {
            return false;
        }
        self.leave_editor_for(None);
        if mods.ctrl {
            self.selection.toggle_row(row)
        } else if mods.shift {
            self.selection.select_row_span(row)
        } else {
            self.selection.select_row(row)
        }
    }

    pub fn click_column_header(&mut self, col: usize) -> bool {
        if col >= self.col_count() {
            return false;
        }
        self.leave_editor_for(None);
        self.selection.select_column(col)
    }

    /// Delete every selected row as one undoable step. Returns the count removed.
    pub fn delete_selected_rows(&mut self) -> crate::error::Result<usize> {
        let rows: Vec<usize> = match self.selection.get().selected_rows() {
            Some(rows) => rows.iter().copied().collect(),
            None => return Ok(0),
        };
        Ok(self.delete_rows(&rows)?.len())
    }

    /// Ask the host for a context menu at a viewport point
    pub fn context_menu(&mut self, x: f64, y: f64) -> bool {
        let target = match self.hit_test(x, y) {
            HitTarget::RowHeader(r) | HitTarget::RowEdge(r) => ContextTarget::RowHeader(r),
            HitTarget::ColumnHeader(c) | HitTarget::ColumnEdge(c) => ContextTarget::ColumnHeader(c),
            HitTarget::Cell(pos) | HitTarget::FillHandle(pos) => ContextTarget::Cell(pos),
            HitTarget::Corner | HitTarget::Outside => return false,
        };
        self.events.push(GridEvent::ContextMenu { target, x, y });
        true
    }

    // === Resize ===

    pub fn begin_column_resize(&mut self, col: usize, x: f64) -> bool {
        if col >= self.col_count() {
            return false;
        }
        self.drag = Some(Drag::Resize(ResizeDrag {
            axis: Axis::Column,
            index: col,
            start: x,
            original: self.dims.cols.size(col),
            was_sticky: self.dims.cols.is_sticky(col),
        }));
        true
    }

    pub fn begin_row_resize(&mut self, row: usize, y: f64) -> bool {
        if row >= self.row_count() {
            return false;
        }
        self.drag = Some(Drag::Resize(ResizeDrag {
            axis: Axis::Row,
            index: row,
            start: y,
            original: self.dims.rows.size(row),
            was_sticky: self.dims.rows.is_sticky(row),
        }));
        true
    }

    /// Follow the pointer along the resize axis
    pub fn update_resize(&mut self, pointer: f64) -> bool {
        let Some(Drag::Resize(drag)) = self.drag else {
            return false;
        };
        let wanted = drag.original + (pointer - drag.start);
        match drag.axis {
            Axis::Column => {
                let width = self.dims.clamp_column_width(wanted);
                self.dims.cols.set_sticky(drag.index, width);
            }
            Axis::Row => {
                let height = self.dims.clamp_row_height(wanted);
                self.dims.rows.set_sticky(drag.index, height);
            }
        }
        true
    }

    pub fn end_resize(&mut self) -> bool {
        let Some(Drag::Resize(drag)) = self.drag else {
            return false;
        };
        self.drag = None;
        if drag.axis == Axis::Column && self.schema().column(drag.index).map(|c| c.wraps()).unwrap_or(false) {
            self.dims.auto_fit_all(&self.table, self.measure.as_ref());
        }
        true
    }

    /// Abort a resize, restoring the size it started from
    pub fn cancel_resize(&mut self) -> bool {
        let Some(Drag::Resize(drag)) = self.drag else {
            return false;
        };
        self.drag = None;
        let map = match drag.axis {
            Axis::Column => &mut self.dims.cols,
            Axis::Row => &mut self.dims.rows,
        };
        map.set(drag.index, drag.original);
        if !drag.was_sticky {
            map.unpin(drag.index);
        }
        true
    }

    // === Fill handle ===

    /// Start a drag-fill from the active cell
    pub fn begin_fill(&mut self) -> bool {
        let Some(anchor) = self.selection.get().active_cell() else {
            return false;
        };
        if !self.in_bounds(anchor) {
            return false;
        }
        self.leave_editor_for(None);
        self.drag = Some(Drag::Fill { anchor, end_row: anchor.row });
        true
    }

    /// Move the fill end row; it may sit above or below the anchor
    pub fn update_fill(&mut self, row: usize) -> bool {
        let last = self.row_count().saturating_sub(1);
        match &mut self.drag {
            Some(Drag::Fill { end_row, .. }) => {
                let row = row.min(last);
                let changed = *end_row != row;
                *end_row = row;
                changed
            }
            _ => false,
        }
    }

    /// Current fill preview: anchor and end row
    pub fn fill_preview(&self) -> Option<(CellPos, usize)> {
        match self.drag {
            Some(Drag::Fill { anchor, end_row }) => Some((anchor, end_row)),
            _ => None,
        }
    }

    /// Copy the anchor value into every row between anchor and end row.
    /// Disabled, readonly or rejecting cells are skipped.
    pub fn end_fill(&mut self) -> UpdateReport {
        let Some(Drag::Fill { anchor, end_row }) = self.drag else {
            return UpdateReport::default();
        };
        self.drag = None;

        let Some(column) = self.schema().column(anchor.col) else {
            return UpdateReport::default();
        };
        let data_type = column.data_type;
        let value = self.value(anchor).unwrap_or_default();
        if !matches_type(data_type, &value) {
            debug!(?anchor, "anchor value does not match its column type, nothing to fill");
            return UpdateReport::default();
        }

        let rows: Vec<usize> = if end_row > anchor.row {
            (anchor.row + 1..=end_row).collect()
        } else {
            (end_row..anchor.row).rev().collect()
        };
        let writes = rows.into_iter().map(|r| (r, anchor.col, value.clone())).collect();
        self.write_cells(writes, true)
    }

    pub fn cancel_fill(&mut self) {
        if matches!(self.drag, Some(Drag::Fill { .. })) {
            self.drag = None;
        }
    }

    // === Pointer routing ===

    /// Route a pointer press at a viewport point
    pub fn pointer_down(&mut self, x: f64, y: f64, mods: Modifiers) -> bool {
        match self.hit_test(x, y) {
            HitTarget::ColumnEdge(c) => self.begin_column_resize(c, x),
            HitTarget::RowEdge(r) => self.begin_row_resize(r, y),
            HitTarget::FillHandle(_) => self.begin_fill(),
            HitTarget::ColumnHeader(c) => self.click_column_header(c),
            HitTarget::RowHeader(r) => self.click_row_header(r, mods),
            HitTarget::Cell(pos) if mods.shift => self.click_cell(pos, mods),
            HitTarget::Cell(pos) => self.begin_range_drag(pos),
            HitTarget::Corner | HitTarget::Outside => false,
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        match self.drag {
            Some(Drag::Resize(drag)) => match drag.axis {
                Axis::Column => self.update_resize(x),
                Axis::Row => self.update_resize(y),
            },
            Some(Drag::Fill { .. }) => {
                let cy = y - self.dims.header_height + self.scroll.1;
                let row = match self.dims.rows.index_at(cy) {
                    Some(r) => r,
                    None if cy < 0.0 => 0,
                    None => self.row_count().saturating_sub(1),
                };
                self.update_fill(row)
            }
            Some(Drag::Range { .. }) => match self.hit_test(x, y) {
                HitTarget::Cell(pos) | HitTarget::FillHandle(pos) => self.update_range_drag(pos),
                _ => false,
            },
            None => false,
        }
    }

    pub fn pointer_up(&mut self) -> bool {
        match self.drag {
            Some(Drag::Resize(_)) => self.end_resize(),
            Some(Drag::Fill { .. }) => self.end_fill().changed > 0,
            Some(Drag::Range { .. }) => {
                self.end_range_drag();
                false
            }
            None => false,
        }
    }
}
