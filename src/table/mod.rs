//! Data & schema store: rows, their per-cell shadow state, and the schema.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::coerce::ValidationError;
use crate::error::{GridError, Result};
use crate::schema::{ColumnDef, RowValues, Schema};
use crate::value::CellValue;


/// Number of rows per chunk for memory-efficient storage
pub const CHUNK_SIZE: usize = 1024;

/// Error marker attached to a cell after a rejected edit
#[derive(Debug, Clone, PartialEq)]
pub struct CellError {
    pub message: String,
    pub persistent: bool,
    pub expires_at: Option<Instant>,
}

impl CellError {
    pub fn from_validation(err: &ValidationError, now: Instant, ttl: Duration) -> Self {
        let persistent = err.is_persistent();
        Self {
            message: err.to_string(),
            persistent,
            expires_at: if persistent { None } else { Some(now + ttl) },
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Internal per-cell state kept beside the user values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellShadow {
    pub disabled: bool,
    pub loading: bool,
    pub error: Option<CellError>,
}

impl CellShadow {
    pub fn is_empty(&self) -> bool {
        !self.disabled && !self.loading && self.error.is_none()
    }
}

/// A row: user values and shadow state, each keyed by column key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub values: RowValues,
    pub shadow: HashMap<String, CellShadow>,
}

impl Row {
    pub fn new(values: RowValues) -> Self {
        Self { values, shadow: HashMap::new() }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.values.get(key)
    }

    /// Owned value for `key`, Null when absent
    pub fn value(&self, key: &str) -> CellValue {
        self.values.get(key).cloned().unwrap_or_default()
    }

    pub fn shadow(&self, key: &str) -> Option<&CellShadow> {
        self.shadow.get(key)
    }

    pub fn shadow_mut(&mut self, key: &str) -> &mut CellShadow {
        self.shadow.entry(key.to_string()).or_default()
    }

    pub fn is_disabled(&self, key: &str) -> bool {
        self.shadow(key).map(|s| s.disabled).unwrap_or(false)
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.shadow(key).map(|s| s.loading).unwrap_or(false)
    }

    pub fn error(&self, key: &str) -> Option<&CellError> {
        self.shadow(key).and_then(|s| s.error.as_ref())
    }

    pub fn has_errors(&self) -> bool {
        self.shadow.values().any(|s| s.error.is_some())
    }
}

/// Pure data structure for the grid with chunked row storage
#[derive(Debug, Clone)]
pub struct Table {
    schema: Schema,
    /// Rows stored in fixed-size chunks; every chunk but the last is full
    chunks: Vec<Vec<Row>>,
    total_rows: usize,
    /// Cells holding a transient error, by expiry time
    expiry: BTreeMap<Instant, Vec<(usize, String)>>,
}

impl Table {
    /// Compute which chunk a row belongs to
    #[inline]
    fn chunk_idx(row: usize) -> usize {
        row / CHUNK_SIZE
    }

    /// Compute the index within a chunk
    #[inline]
    fn row_in_chunk(row: usize) -> usize {
        row % CHUNK_SIZE
    }

    #[inline]
    fn get_chunk(&self, row: usize) -> Option<&Vec<Row>> {
        self.chunks.get(Self::chunk_idx(row))
    }

    #[inline]
    fn get_chunk_mut(&mut self, row: usize) -> Option<&mut Vec<Row>> {
        self.chunks.get_mut(Self::chunk_idx(row))
    }

    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        let mut table = Self { schema, chunks: Vec::new(), total_rows: 0, expiry: BTreeMap::new() };
        table.replace_rows(rows);
        table
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.total_rows
    }

    pub fn col_count(&self) -> usize {
        self.schema.len()
    }

    pub fn rows_iter(&self) -> impl Iterator<Item = &Row> {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    pub fn get_row(&self, idx: usize) -> Option<&Row> {
        self.get_chunk(idx)?.get(Self::row_in_chunk(idx))
    }

    pub fn get_row_mut(&mut self, idx: usize) -> Option<&mut Row> {
        self.get_chunk_mut(idx)?.get_mut(Self::row_in_chunk(idx))
    }

    pub fn get_value(&self, row: usize, key: &str) -> Option<&CellValue> {
        self.get_row(row)?.get(key)
    }

    /// Store a value, returning the previous one. Does not validate.
    pub fn set_value(&mut self, row: usize, key: &str, value: CellValue) -> Option<CellValue> {
        if self.schema.position(key).is_none() {
            return None;
        }
        let r = self.get_row_mut(row)?;
        Some(r.values.insert(key.to_string(), value).unwrap_or_default())
    }

    /// A fresh row populated with the schema defaults
    pub fn default_row(&self) -> Row {
        let values = self
            .schema
            .iter()
            .map(|c| (c.key.clone(), c.default_value.clone()))
            .collect();
        let mut row = Row::new(values);
        Self::apply_disabled(&self.schema, &mut row);
        row
    }

    /// Fill in schema keys missing from `row` with their defaults
    pub fn complete_row(&self, row: &mut Row) {
        for col in self.schema.iter() {
            row.values
                .entry(col.key.clone())
                .or_insert_with(|| col.default_value.clone());
        }
    }

    /// Replace every row at once
    pub fn replace_rows(&mut self, mut rows: Vec<Row>) {
        for row in rows.iter_mut() {
            self.complete_row(row);
            Self::apply_disabled(&self.schema, row);
        }
        self.total_rows = rows.len();
        self.chunks = Vec::with_capacity(rows.len() / CHUNK_SIZE + 1);
        self.expiry.clear();
        for (idx, row) in rows.iter().enumerate() {
            Self::index_errors(&mut self.expiry, idx, row);
        }
        let mut iter = rows.into_iter().peekable();
        while iter.peek().is_some() {
            self.chunks.push(iter.by_ref().take(CHUNK_SIZE).collect());
        }
    }

    pub fn insert_row_at(&mut self, idx: usize, mut row: Row) {
        self.complete_row(&mut row);
        Self::apply_disabled(&self.schema, &mut row);
        let idx = idx.min(self.total_rows);
        self.shift_expiry(|r| if r >= idx { Some(r + 1) } else { Some(r) });
        Self::index_errors(&mut self.expiry, idx, &row);
        self.insert_row_internal(idx, row);
    }

    /// Internal helper to insert a row and handle chunk rebalancing
    fn insert_row_internal(&mut self, idx: usize, row: Row) {
        if self.chunks.is_empty() {
            self.chunks.push(vec![row]);
            self.total_rows = 1;
            return;
        }

        let chunk_idx = Self::chunk_idx(idx.min(self.total_rows));
        let row_in_chunk = if idx >= self.total_rows {
            // Appending at end
            self.chunks[self.chunks.len() - 1].len()
        } else {
            Self::row_in_chunk(idx)
        };

        let actual_chunk = chunk_idx.min(self.chunks.len() - 1);
        let insert_pos = row_in_chunk.min(self.chunks[actual_chunk].len());
        self.chunks[actual_chunk].insert(insert_pos, row);
        self.total_rows += 1;

        self.rebalance_chunks_after_insert(actual_chunk);
    }

    /// Cascade overflow into the following chunks
    fn rebalance_chunks_after_insert(&mut self, start_chunk: usize) {
        let mut chunk_idx = start_chunk;
        while chunk_idx < self.chunks.len() && self.chunks[chunk_idx].len() > CHUNK_SIZE {
            let overflow = self.chunks[chunk_idx].split_off(CHUNK_SIZE);
            if chunk_idx + 1 < self.chunks.len() {
                let next_chunk = &mut self.chunks[chunk_idx + 1];
                for (i, row) in overflow.into_iter().enumerate() {
                    next_chunk.insert(i, row);
                }
            } else {
                self.chunks.push(overflow);
            }
            chunk_idx += 1;
        }
    }

    pub fn delete_row_at(&mut self, idx: usize) -> Option<Row> {
        if idx >= self.total_rows {
            return None;
        }

        let chunk_idx = Self::chunk_idx(idx);
        let removed = self.chunks[chunk_idx].remove(Self::row_in_chunk(idx));
        self.total_rows -= 1;
        self.shift_expiry(|r| match r.cmp(&idx) {
            std::cmp::Ordering::Less => Some(r),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(r - 1),
        });

        self.rebalance_chunks_after_delete(chunk_idx);
        Some(removed)
    }

    /// Pull rows forward so every chunk except the last stays full
    fn rebalance_chunks_after_delete(&mut self, start_chunk: usize) {
        let mut chunk_idx = start_chunk;

        while chunk_idx < self.chunks.len() {
            if self.chunks[chunk_idx].is_empty() {
                self.chunks.remove(chunk_idx);
                continue;
            }

            while chunk_idx + 1 < self.chunks.len() && self.chunks[chunk_idx].len() < CHUNK_SIZE {
                let needed = CHUNK_SIZE - self.chunks[chunk_idx].len();
                let available = self.chunks[chunk_idx + 1].len().min(needed);

                let pulled: Vec<Row> = self.chunks[chunk_idx + 1].drain(0..available).collect();
                self.chunks[chunk_idx].extend(pulled);

                if self.chunks[chunk_idx + 1].is_empty() {
                    self.chunks.remove(chunk_idx + 1);
                }
            }

            chunk_idx += 1;
        }
    }

    /// Insert a column into the schema and every row.
    /// `values` is indexed by row; missing entries get the column default.
    pub fn insert_column(&mut self, at: usize, column: ColumnDef, values: Vec<CellValue>) -> Result<()> {
        let key = column.key.clone();
        let default = column.default_value.clone();
        self.schema.insert(at, column)?;

        let mut values = values.into_iter();
        for chunk in self.chunks.iter_mut() {
            for row in chunk.iter_mut() {
                let v = values.next().unwrap_or_else(|| default.clone());
                row.values.insert(key.clone(), v);
            }
        }
        self.recompute_all_disabled();
        Ok(())
    }

    /// Remove a column from the schema and every row, returning its values
    pub fn remove_column(&mut self, at: usize) -> Result<(ColumnDef, Vec<CellValue>)> {
        let count = self.schema.len();
        let column = self
            .schema
            .remove(at)
            .ok_or(GridError::ColumnOutOfBounds { index: at, count })?;

        let mut values = Vec::with_capacity(self.total_rows);
        for chunk in self.chunks.iter_mut() {
            for row in chunk.iter_mut() {
                values.push(row.values.remove(&column.key).unwrap_or_default());
                row.shadow.remove(&column.key);
            }
        }
        Ok((column, values))
    }

    fn apply_disabled(schema: &Schema, row: &mut Row) -> bool {
        let mut changed = false;
        for col in schema.iter().filter(|c| c.disabled.is_some()) {
            let disabled = col.is_disabled_for(&row.values);
            let shadow = row.shadow_mut(&col.key);
            if shadow.disabled != disabled {
                shadow.disabled = disabled;
                changed = true;
            }
        }
        changed
    }

    /// Re-evaluate every column's disabled predicate for one row.
    /// Returns true if any flag flipped.
    pub fn recompute_disabled(&mut self, row: usize) -> bool {
        let Some(chunk) = self.chunks.get_mut(Self::chunk_idx(row)) else {
            return false;
        };
        match chunk.get_mut(Self::row_in_chunk(row)) {
            Some(r) => Self::apply_disabled(&self.schema, r),
            None => false,
        }
    }

    pub fn recompute_all_disabled(&mut self) {
        for chunk in self.chunks.iter_mut() {
            for row in chunk.iter_mut() {
                Self::apply_disabled(&self.schema, row);
            }
        }
    }

    pub fn is_disabled(&self, row: usize, key: &str) -> bool {
        self.get_row(row).map(|r| r.is_disabled(key)).unwrap_or(false)
    }

    /// Attach an error marker to a cell; transient ones are indexed for expiry
    pub fn set_error(&mut self, row: usize, key: &str, error: CellError) -> bool {
        let expires_at = error.expires_at;
        let Some(r) = self.get_row_mut(row) else {
            return false;
        };
        r.shadow_mut(key).error = Some(error);
        if let Some(at) = expires_at {
            self.expiry.entry(at).or_default().push((row, key.to_string()));
        }
        true
    }

    /// Drop transient error markers whose time has passed. Only cells in
    /// the expiry index are visited.
    pub fn expire_errors(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Some(entry) = self.expiry.first_entry() {
            if *entry.key() > now {
                break;
            }
            for (row, key) in entry.remove() {
                // the marker may have been cleared or replaced since
                let shadow = self.get_row_mut(row).and_then(|r| r.shadow.get_mut(&key));
                if let Some(shadow) = shadow {
                    if shadow.error.as_ref().map(|e| e.is_expired(now)).unwrap_or(false) {
                        shadow.error = None;
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    #[cfg(test)]
    pub(crate) fn pending_expiries(&self) -> usize {
        self.expiry.values().map(|cells| cells.len()).sum()
    }

    fn index_errors(expiry: &mut BTreeMap<Instant, Vec<(usize, String)>>, idx: usize, row: &Row) {
        for (key, shadow) in &row.shadow {
            if let Some(at) = shadow.error.as_ref().and_then(|e| e.expires_at) {
                expiry.entry(at).or_default().push((idx, key.clone()));
            }
        }
    }

    /// Re-point indexed cells after rows moved; `None` drops the entry
    fn shift_expiry(&mut self, remap: impl Fn(usize) -> Option<usize>) {
        for cells in self.expiry.values_mut() {
            cells.retain_mut(|(row, _)| match remap(*row) {
                Some(r) => {
                    *row = r;
                    true
                }
                None => false,
            });
        }
        self.expiry.retain(|_, cells| !cells.is_empty());
    }
}
