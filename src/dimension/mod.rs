//! Dimension engine: row/column sizes, extents, viewport culling and hit-testing.

pub mod sizes;
pub mod wrap;


pub use sizes::{IndexSpan, SizeMap};
pub use wrap::{FitMetrics, MonospaceMeasure, TextMeasure};

use crate::config::GridConfig;
use crate::selection::CellPos;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Rows and columns intersecting the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    pub rows: Option<IndexSpan>,
    pub cols: Option<IndexSpan>,
}

impl VisibleRange {
    pub fn is_empty(&self) -> bool {
        self.rows.is_none() || self.cols.is_none()
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        matches!((self.rows, self.cols), (Some(r), Some(c)) if r.contains(pos.row) && c.contains(pos.col))
    }
}

/// What lies under a point in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Corner,
    ColumnHeader(usize),
    /// Within tolerance of the right edge of this column
    ColumnEdge(usize),
    RowHeader(usize),
    /// Within tolerance of the bottom edge of this row
    RowEdge(usize),
    Cell(CellPos),
    FillHandle(CellPos),
    Outside,
}

#[derive(Debug, Clone)]
pub struct Dimensions {
    pub rows: SizeMap,
    pub cols: SizeMap,
    pub header_height: f64,
    pub row_header_width: f64,
    pub resize_tolerance: f64,
    pub min_col_width: f64,
    pub max_col_width: f64,
    pub min_row_height: f64,
    pub max_row_height: f64,
    pub fit: FitMetrics,
}

impl Dimensions {
    pub fn new(config: &GridConfig, row_count: usize, col_count: usize) -> Self {
        Self {
            rows: SizeMap::new(row_count, config.default_row_height),
            cols: SizeMap::new(col_count, config.default_col_width),
            header_height: config.header_height,
            row_header_width: config.row_header_width,
            resize_tolerance: config.resize_tolerance,
            min_col_width: config.min_col_width,
            max_col_width: config.max_col_width,
            min_row_height: config.min_row_height,
            max_row_height: config.max_row_height,
            fit: FitMetrics {
                line_height: config.line_height,
                padding: config.cell_padding,
                default_height: config.default_row_height,
            },
        }
    }

    /// Total content (width, height)
    pub fn calculate_extents(&self) -> (f64, f64) {
        (self.cols.total(), self.rows.total())
    }

    pub fn column_left(&self, col: usize) -> f64 {
        self.cols.offset(col)
    }

    pub fn row_top(&self, row: usize) -> f64 {
        self.rows.offset(row)
    }

    pub fn column_width(&self, col: usize) -> f64 {
        self.cols.size(col)
    }

    pub fn row_height(&self, row: usize) -> f64 {
        self.rows.size(row)
    }

    /// Visible rows and columns for a cell-area viewport at the given scroll offset
    pub fn compute_visible_range(&self, scroll_x: f64, scroll_y: f64, width: f64, height: f64) -> VisibleRange {
        VisibleRange {
            rows: self.rows.visible(scroll_y, height),
            cols: self.cols.visible(scroll_x, width),
        }
    }

    /// Bounds of a cell in content coordinates
    pub fn cell_rect(&self, pos: CellPos) -> Rect {
        Rect {
            x: self.cols.offset(pos.col),
            y: self.rows.offset(pos.row),
            width: self.cols.size(pos.col),
            height: self.rows.size(pos.row),
        }
    }

    /// Bounds of a cell in viewport coordinates (headers included)
    pub fn cell_rect_in_viewport(&self, pos: CellPos, scroll_x: f64, scroll_y: f64) -> Rect {
        let r = self.cell_rect(pos);
        Rect {
            x: r.x - scroll_x + self.row_header_width,
            y: r.y - scroll_y + self.header_height,
            ..r
        }
    }

    pub fn clamp_column_width(&self, width: f64) -> f64 {
        width.clamp(self.min_col_width, self.max_col_width)
    }

    pub fn clamp_row_height(&self, height: f64) -> f64 {
        height.clamp(self.min_row_height, self.max_row_height)
    }

    fn edge_hit(map: &SizeMap, pos: f64, tolerance: f64) -> Option<usize> {
        match map.index_at(pos) {
            Some(i) => {
                let left = map.offset(i);
                let right = left + map.size(i);
                if right - pos <= tolerance {
                    Some(i)
                } else if pos - left <= tolerance && i > 0 {
                    Some(i - 1)
                } else {
                    None
                }
            }
            // just past the last item still grabs its edge
            None if map.count() > 0 && pos >= map.total() && pos - map.total() <= tolerance => {
                Some(map.count() - 1)
            }
            None => None,
        }
    }

    /// Classify a point given in viewport coordinates
    pub fn hit_test(&self, x: f64, y: f64, scroll_x: f64, scroll_y: f64) -> HitTarget {
        if x < 0.0 || y < 0.0 {
            return HitTarget::Outside;
        }
        let cx = x - self.row_header_width + scroll_x;
        let cy = y - self.header_height + scroll_y;

        match (y < self.header_height, x < self.row_header_width) {
            (true, true) => HitTarget::Corner,
            (true, false) => {
                if let Some(col) = Self::edge_hit(&self.cols, cx, self.resize_tolerance) {
                    return HitTarget::ColumnEdge(col);
                }
                self.cols.index_at(cx).map(HitTarget::ColumnHeader).unwrap_or(HitTarget::Outside)
            }
            (false, true) => {
                if let Some(row) = Self::edge_hit(&self.rows, cy, self.resize_tolerance) {
                    return HitTarget::RowEdge(row);
                }
                self.rows.index_at(cy).map(HitTarget::RowHeader).unwrap_or(HitTarget::Outside)
            }
            (false, false) => match (self.rows.index_at(cy), self.cols.index_at(cx)) {
                (Some(row), Some(col)) => HitTarget::Cell(CellPos::new(row, col)),
                _ => HitTarget::Outside,
            },
        }
    }

    /// Re-fit the given rows to their wrapped content, leaving user-sized rows alone
    pub fn auto_fit_rows(&mut self, table: &Table, rows: &[usize], measure: &dyn TextMeasure) {
        let candidates: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&r| r < self.rows.count() && !self.rows.is_sticky(r))
            .collect();
        if candidates.is_empty() {
            return;
        }
        let heights = wrap::measure_rows(table, &self.cols, &candidates, measure, self.fit);
        self.rows.set_many(heights);
    }

    pub fn auto_fit_all(&mut self, table: &Table, measure: &dyn TextMeasure) {
        let rows: Vec<usize> = (0..self.rows.count()).collect();
        self.auto_fit_rows(table, &rows, measure);
    }
}
