//! The grid facade: owns the table, dimensions, selection, copy buffer,
//! editor and history, and keeps them consistent across every mutation.

mod editing;
mod interaction;
mod paste;
mod undo;

#[cfg(test)]
mod test;

pub use interaction::{Direction, Modifiers};

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::clipboard::CopyBuffer;
use crate::coerce::{coerce, ValidationError};
use crate::config::GridConfig;
use crate::dimension::{Dimensions, HitTarget, MonospaceMeasure, Rect, TextMeasure, VisibleRange};
use crate::editor::{EditorState, JobCounter, OptionResponse};
use crate::error::{GridError, Result};
use crate::event::GridEvent;
use crate::history::{CellChange, History, HistoryEntry, RowLayout};
use crate::schema::{ColumnDef, OptionSource, RowValues, Schema, SelectOption};
use crate::selection::{CellPos, Selection, SelectionModel};
use crate::table::{CellError, Row, Table};
use crate::value::CellValue;

/// A pointer drag in progress. Only one can be active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Drag {
    Range { anchor: CellPos },
    Fill { anchor: CellPos, end_row: usize },
    Resize(interaction::ResizeDrag),
}

/// One programmatic cell write
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub row: usize,
    pub key: String,
    pub value: CellValue,
}

impl CellUpdate {
    pub fn new(row: usize, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self { row, key: key.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCell {
    pub row: usize,
    pub key: String,
    pub error: ValidationError,
}

/// Outcome of a multi-cell write. Nothing is all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Cells whose value passed validation (changed or not)
    pub accepted: usize,
    /// Cells whose stored value actually changed
    pub changed: usize,
    /// Cells skipped because they were disabled or readonly
    pub skipped: usize,
    pub rejected: Vec<RejectedCell>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Add a `_shadow` object with per-cell disabled/loading/error state
    pub include_shadow: bool,
    /// Drop rows holding an error marker or an empty required cell
    pub skip_invalid: bool,
    /// Only export columns inside the current viewport
    pub visible_columns_only: bool,
}

pub const SHADOW_KEY: &str = "_shadow";

pub struct Grid {
    table: Table,
    dims: Dimensions,
    selection: SelectionModel,
    copy: CopyBuffer,
    drag: Option<Drag>,
    editor: EditorState,
    history: History,
    events: Vec<GridEvent>,
    config: GridConfig,
    measure: Box<dyn TextMeasure>,
    scroll: (f64, f64),
    /// Full widget size, headers included
    viewport: (f64, f64),
    /// Options last produced by resolvers, per (row, column key).
    /// Cleared whenever row indices shift.
    option_cache: HashMap<(usize, String), Vec<SelectOption>>,
    jobs: JobCounter,
    replies_tx: Sender<OptionResponse>,
    replies_rx: Receiver<OptionResponse>,
    /// Time of the last `tick`; stamps error expiry and search deadlines
    now: Instant,
}

impl Grid {
    pub fn new(schema: Schema, config: GridConfig) -> Self {
        let (replies_tx, replies_rx) = mpsc::channel();
        let col_count = schema.len();
        Self {
            dims: Dimensions::new(&config, 0, col_count),
            table: Table::new(schema, Vec::new()),
            selection: SelectionModel::new(),
            copy: CopyBuffer::Empty,
            drag: None,
            editor: EditorState::Idle,
            history: History::new(config.history_capacity),
            events: Vec::new(),
            measure: Box::new(MonospaceMeasure { char_width: config.char_width }),
            config,
            scroll: (0.0, 0.0),
            viewport: (0.0, 0.0),
            option_cache: HashMap::new(),
            jobs: JobCounter::new(),
            replies_tx,
            replies_rx,
            now: Instant::now(),
        }
    }

    pub fn with_records(schema: Schema, records: Vec<Map<String, JsonValue>>, config: GridConfig) -> Self {
        let mut grid = Self::new(schema, config);
        grid.replace_rows(records);
        grid
    }

    pub fn set_text_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
        self.dims.auto_fit_all(&self.table, self.measure.as_ref());
    }

    // === Accessors ===

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn schema(&self) -> &Schema {
        self.table.schema()
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn col_count(&self) -> usize {
        self.table.col_count()
    }

    /// Owned copy of a cell value
    pub fn value(&self, pos: CellPos) -> Option<CellValue> {
        let key = &self.schema().column(pos.col)?.key;
        self.table.get_row(pos.row).map(|r| r.value(key))
    }

    pub fn cell_error(&self, pos: CellPos) -> Option<&CellError> {
        let key = &self.schema().column(pos.col)?.key;
        self.table.get_row(pos.row)?.error(key)
    }

    pub fn is_cell_disabled(&self, pos: CellPos) -> bool {
        self.key_at(pos.col)
            .map(|key| self.table.is_disabled(pos.row, &key))
            .unwrap_or(false)
    }

    pub fn selection(&self) -> &Selection {
        self.selection.get()
    }

    pub fn copy_buffer(&self) -> &CopyBuffer {
        &self.copy
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn key_at(&self, col: usize) -> Option<String> {
        self.schema().column(col).map(|c| c.key.clone())
    }

    // === Viewport ===

    pub fn set_viewport(&mut self, scroll_x: f64, scroll_y: f64, width: f64, height: f64) {
        self.scroll = (scroll_x.max(0.0), scroll_y.max(0.0));
        self.viewport = (width.max(0.0), height.max(0.0));
    }

    pub fn scroll(&self) -> (f64, f64) {
        self.scroll
    }

    /// Rows and columns the paint consumer has to draw
    pub fn visible_range(&self) -> VisibleRange {
        let width = (self.viewport.0 - self.dims.row_header_width).max(0.0);
        let height = (self.viewport.1 - self.dims.header_height).max(0.0);
        self.dims.compute_visible_range(self.scroll.0, self.scroll.1, width, height)
    }

    /// Cell bounds in viewport coordinates
    pub fn cell_rect(&self, pos: CellPos) -> Rect {
        self.dims.cell_rect_in_viewport(pos, self.scroll.0, self.scroll.1)
    }

    /// Square drawn at the bottom-right corner of the active cell
    pub fn fill_handle_rect(&self) -> Option<Rect> {
        let pos = match self.selection.get() {
            Selection::Cell(pos) => *pos,
            _ => return None,
        };
        let cell = self.cell_rect(pos);
        let size = self.config.fill_handle_size;
        Some(Rect {
            x: cell.right() - size / 2.0,
            y: cell.bottom() - size / 2.0,
            width: size,
            height: size,
        })
    }

    pub fn hit_test(&self, x: f64, y: f64) -> HitTarget {
        if let (Some(handle), Some(pos)) = (self.fill_handle_rect(), self.selection.get().active_cell()) {
            if handle.contains(x, y) {
                return HitTarget::FillHandle(pos);
            }
        }
        self.dims.hit_test(x, y, self.scroll.0, self.scroll.1)
    }

    // === Timers and async ===

    /// Advance the grid clock: expire transient errors, fire due searches,
    /// apply resolver replies. Returns true if anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.now = now;
        let mut dirty = self.table.expire_errors(now);
        if self.editor.list().map(|l| l.search_due(now)).unwrap_or(false) {
            self.request_options();
            dirty = true;
        }
        dirty |= self.poll_options();
        dirty
    }

    /// Mark a cell as waiting for external data; loading cells cannot be edited
    pub fn set_cell_loading(&mut self, pos: CellPos, loading: bool) -> Result<()> {
        let key = self.checked_key(pos)?;
        if let Some(row) = self.table.get_row_mut(pos.row) {
            row.shadow_mut(&key).loading = loading;
        }
        Ok(())
    }

    fn checked_key(&self, pos: CellPos) -> Result<String> {
        if pos.row >= self.row_count() {
            return Err(GridError::RowOutOfBounds { index: pos.row, count: self.row_count() });
        }
        self.key_at(pos.col)
            .ok_or(GridError::ColumnOutOfBounds { index: pos.col, count: self.col_count() })
    }

    // === Data I/O ===

    /// Replace the whole dataset. Resets selection, editing, copy and history.
    pub fn replace_rows(&mut self, records: Vec<Map<String, JsonValue>>) {
        let rows: Vec<Row> = records.iter().map(|r| self.row_from_record(r)).collect();
        info!("replacing dataset with {} rows", rows.len());
        self.table.replace_rows(rows);
        self.dims.rows.reset(self.table.row_count());
        self.reset_ephemeral();
        self.option_cache.clear();
        self.history.clear();
        self.dims.auto_fit_all(&self.table, self.measure.as_ref());
    }

    /// Coerce a record against the schema. Values that fail stay as given;
    /// empty required cells get a persistent marker.
    fn row_from_record(&self, record: &Map<String, JsonValue>) -> Row {
        let mut row = Row::new(RowValues::new());
        for column in self.schema().iter() {
            let raw = match record.get(&column.key) {
                Some(v) => CellValue::from_json(v),
                None => column.default_value.clone(),
            };
            let options = self.options_for(None, column);
            let value = match coerce(column, &raw, &options) {
                Ok(v) => v,
                Err(err) => {
                    debug!(key = %column.key, %err, "keeping unvalidated value");
                    if err.is_persistent() {
                        row.shadow_mut(&column.key).error =
                            Some(CellError::from_validation(&err, self.now, self.config.transient_error_ttl()));
                    }
                    raw
                }
            };
            row.values.insert(column.key.clone(), value);
        }
        row
    }

    /// Isolated copy of the data as flat records
    pub fn export(&self, options: ExportOptions) -> Vec<Map<String, JsonValue>> {
        let keys: Vec<&str> = if options.visible_columns_only {
            match self.visible_range().cols {
                Some(span) => span.iter().filter_map(|c| self.schema().column(c)).map(|c| c.key.as_str()).collect(),
                None => Vec::new(),
            }
        } else {
            self.schema().keys().collect()
        };

        self.table
            .rows_iter()
            .filter(|row| !options.skip_invalid || !self.is_row_invalid(row))
            .map(|row| {
                let mut record: Map<String, JsonValue> =
                    keys.iter().map(|k| (k.to_string(), row.value(k).to_json())).collect();
                if options.include_shadow {
                    let shadow: Map<String, JsonValue> = keys
                        .iter()
                        .filter_map(|k| row.shadow(k).filter(|s| !s.is_empty()).map(|s| (k, s)))
                        .map(|(k, s)| {
                            (
                                k.to_string(),
                                json!({
                                    "disabled": s.disabled,
                                    "loading": s.loading,
                                    "error": s.error.as_ref().map(|e| e.message.clone()),
                                }),
                            )
                        })
                        .collect();
                    record.insert(SHADOW_KEY.to_string(), JsonValue::Object(shadow));
                }
                record
            })
            .collect()
    }

    fn is_row_invalid(&self, row: &Row) -> bool {
        row.has_errors()
            || self
                .schema()
                .iter()
                .any(|c| c.required && row.get(&c.key).map(|v| v.is_blank()).unwrap_or(true))
    }

    // === Structural mutation ===

    /// Insert a row of schema defaults at `at` (or append), returning its index
    pub fn add_row(&mut self, at: Option<usize>) -> Result<usize> {
        let count = self.row_count();
        let idx = at.unwrap_or(count);
        if idx > count {
            return Err(GridError::RowOutOfBounds { index: idx, count });
        }
        let entry = HistoryEntry::RowInsert { rows: vec![(idx, self.table.default_row())], layout: Vec::new() };
        self.apply_entry(&entry)?;
        self.history.record(entry);
        info!("inserted row {}", idx);
        Ok(idx)
    }

    /// Delete rows by index as one history entry, returning the removed rows
    pub fn delete_rows(&mut self, indices: &[usize]) -> Result<Vec<Row>> {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        let count = self.row_count();
        if let Some(&bad) = indices.iter().find(|&&i| i >= count) {
            return Err(GridError::RowOutOfBounds { index: bad, count });
        }
        let rows: Vec<(usize, Row)> = indices
            .iter()
            .filter_map(|&i| self.table.get_row(i).map(|r| (i, r.clone())))
            .collect();
        let removed = rows.iter().map(|(_, r)| r.clone()).collect();
        let layout = indices
            .iter()
            .map(|&i| RowLayout { height: self.dims.rows.size(i), sticky: self.dims.rows.is_sticky(i) })
            .collect();
        let entry = HistoryEntry::RowDelete { rows, layout };
        self.apply_entry(&entry)?;
        self.history.record(entry);
        info!("deleted {} rows", indices.len());
        Ok(removed)
    }

    pub fn add_column(&mut self, at: usize, column: ColumnDef) -> Result<usize> {
        if self.schema().position(&column.key).is_some() {
            return Err(GridError::DuplicateColumn(column.key));
        }
        let index = at.min(self.col_count());
        let values = vec![column.default_value.clone(); self.row_count()];
        let key = column.key.clone();
        let entry = HistoryEntry::ColumnInsert { index, column, values };
        self.apply_entry(&entry)?;
        self.history.record(entry);
        info!("added column '{}' at {}", key, index);
        Ok(index)
    }

    pub fn remove_column(&mut self, index: usize) -> Result<ColumnDef> {
        let count = self.col_count();
        let column = self
            .schema()
            .column(index)
            .cloned()
            .ok_or(GridError::ColumnOutOfBounds { index, count })?;
        if !column.removable {
            return Err(GridError::ColumnNotRemovable(column.key));
        }
        let values = self.table.rows_iter().map(|r| r.value(&column.key)).collect();
        let entry = HistoryEntry::ColumnDelete { index, column: column.clone(), values };
        self.apply_entry(&entry)?;
        self.history.record(entry);
        info!("removed column '{}'", column.key);
        Ok(column)
    }

    pub fn remove_column_by_key(&mut self, key: &str) -> Result<ColumnDef> {
        let index = self
            .schema()
            .position(key)
            .ok_or_else(|| GridError::UnknownColumn(key.to_string()))?;
        self.remove_column(index)
    }

    /// Validate and apply a batch of writes. Unknown columns or rows fail the
    /// whole call; values that fail validation are skipped and reported.
    pub fn update_cells(&mut self, batch: Vec<CellUpdate>) -> Result<UpdateReport> {
        let count = self.row_count();
        let mut writes = Vec::with_capacity(batch.len());
        for update in batch {
            if update.row >= count {
                return Err(GridError::RowOutOfBounds { index: update.row, count });
            }
            let col = self
                .schema()
                .position(&update.key)
                .ok_or_else(|| GridError::UnknownColumn(update.key.clone()))?;
            writes.push((update.row, col, update.value));
        }
        Ok(self.write_cells(writes, false))
    }

    // === Shared internals ===

    /// Options a select column can currently be coerced against. Resolved
    /// options only apply to the row they were resolved for.
    pub(crate) fn options_for(&self, row: Option<usize>, column: &ColumnDef) -> Vec<SelectOption> {
        match (&column.options, row) {
            (Some(OptionSource::Static(opts)), _) => opts.clone(),
            (_, Some(row)) => self.option_cache.get(&(row, column.key.clone())).cloned().unwrap_or_default(),
            (_, None) => Vec::new(),
        }
    }

    /// The single write path: coerce each value against its own column, skip
    /// what fails, apply the rest as one history entry.
    ///
    /// `guarded` writes come from user interaction and skip readonly or
    /// disabled cells.
    pub(crate) fn write_cells(&mut self, writes: Vec<(usize, usize, CellValue)>, guarded: bool) -> UpdateReport {
        let mut report = UpdateReport::default();
        let mut pending: HashMap<(usize, usize), CellValue> = HashMap::new();
        let mut changes = Vec::new();
        let mut accepted = Vec::new();

        for (row, col, raw) in writes {
            let Some(column) = self.schema().column(col) else {
                continue;
            };
            let Some(current) = self.table.get_row(row) else {
                continue;
            };
            if guarded && (column.readonly || current.is_disabled(&column.key)) {
                debug!(row, key = %column.key, "skipping guarded cell");
                report.skipped += 1;
                continue;
            }
            let options = self.options_for(Some(row), column);
            match coerce(column, &raw, &options) {
                Ok(value) => {
                    let old = pending
                        .get(&(row, col))
                        .cloned()
                        .unwrap_or_else(|| current.value(&column.key));
                    report.accepted += 1;
                    accepted.push((row, column.key.clone()));
                    if old != value {
                        pending.insert((row, col), value.clone());
                        changes.push(CellChange { row, key: column.key.clone(), old, new: value });
                    }
                }
                Err(error) => {
                    debug!(row, key = %column.key, %error, "skipping invalid value");
                    report.rejected.push(RejectedCell { row, key: column.key.clone(), error });
                }
            }
        }

        for (row, key) in &accepted {
            self.clear_error(*row, key);
        }
        report.changed = changes.len();
        if !changes.is_empty() {
            let entry = HistoryEntry::CellBatch(changes);
            match self.apply_entry(&entry) {
                Ok(()) => {
                    self.history.record(entry);
                }
                Err(e) => warn!("failed to apply cell batch: {}", e),
            }
        }
        report
    }

    pub(crate) fn clear_error(&mut self, row: usize, key: &str) {
        if let Some(shadow) = self.table.get_row_mut(row).and_then(|r| r.shadow.get_mut(key)) {
            shadow.error = None;
        }
    }

    pub(crate) fn set_error(&mut self, pos: CellPos, error: &ValidationError) {
        let Some(key) = self.key_at(pos.col) else {
            return;
        };
        let marker = CellError::from_validation(error, self.now, self.config.transient_error_ttl());
        self.table.set_error(pos.row, &key, marker);
    }

    /// Apply an entry to the table and bring dimensions, selection and
    /// listeners up to date. Used for fresh mutations and replays alike.
    pub(crate) fn apply_entry(&mut self, entry: &HistoryEntry) -> Result<()> {
        entry.apply(&mut self.table)?;
        match entry {
            HistoryEntry::CellBatch(changes) => {
                let mut by_row: BTreeMap<usize, (Vec<String>, RowValues)> = BTreeMap::new();
                for change in changes {
                    let (keys, previous) = by_row.entry(change.row).or_default();
                    if !previous.contains_key(&change.key) {
                        keys.push(change.key.clone());
                        previous.insert(change.key.clone(), change.old.clone());
                    }
                    self.clear_error(change.row, &change.key);
                }
                let rows: Vec<usize> = by_row.keys().copied().collect();
                for (row, (keys, previous)) in by_row {
                    let snapshot = self.table.get_row(row).map(|r| r.values.clone()).unwrap_or_default();
                    self.events.push(GridEvent::CellsUpdated { row, keys, snapshot, previous });
                }
                self.dims.auto_fit_rows(&self.table, &rows, self.measure.as_ref());
            }
            HistoryEntry::RowInsert { rows, layout } => {
                let indices: Vec<usize> = rows.iter().map(|(i, _)| *i).collect();
                for &idx in &indices {
                    self.dims.rows.insert(idx, 1);
                }
                // user-sized rows come back pinned at their old height
                for (&idx, l) in indices.iter().zip(layout).filter(|(_, l)| l.sticky) {
                    self.dims.rows.set_sticky(idx, l.height);
                }
                self.after_row_change();
                self.dims.auto_fit_rows(&self.table, &indices, self.measure.as_ref());
                self.events.push(GridEvent::RowsInserted { indices });
            }
            HistoryEntry::RowDelete { rows, .. } => {
                for (idx, _) in rows.iter().rev() {
                    self.dims.rows.remove(*idx);
                }
                if self.selection.get().selected_rows().is_some() {
                    self.selection.clear();
                }
                self.after_row_change();
                for (index, row) in rows {
                    self.events.push(GridEvent::RowDeleted { index: *index, row: row.clone() });
                }
            }
            HistoryEntry::ColumnInsert { column, .. } => {
                let index = self.schema().position(&column.key).unwrap_or(0);
                self.dims.cols.insert(index, 1);
                self.reset_ephemeral();
                self.dims.auto_fit_all(&self.table, self.measure.as_ref());
                self.events.push(GridEvent::ColumnInserted { key: column.key.clone(), index });
            }
            HistoryEntry::ColumnDelete { index, column, .. } => {
                self.dims.cols.remove(*index);
                self.option_cache.retain(|(_, key), _| key != &column.key);
                self.reset_ephemeral();
                self.dims.auto_fit_all(&self.table, self.measure.as_ref());
                self.events.push(GridEvent::ColumnDeleted { key: column.key.clone(), index: *index });
            }
        }
        Ok(())
    }

    /// Row indices shifted: drop anything pointing at stale positions
    fn after_row_change(&mut self) {
        self.abandon_editor();
        self.option_cache.clear();
        self.drag = None;
        self.selection.clamp(self.row_count(), self.col_count());
    }

    /// Forget every piece of interaction state
    fn reset_ephemeral(&mut self) {
        self.abandon_editor();
        self.drag = None;
        self.selection.clear();
        self.copy = CopyBuffer::Empty;
    }
}
