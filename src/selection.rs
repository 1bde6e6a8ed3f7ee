use std::cmp;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Rectangle between two corners. `start`/`end` keep the drag direction;
/// the accessors always report normalized bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellPos,
    pub end: CellPos,
}

impl CellRange {
    pub fn new(start: CellPos, end: CellPos) -> Self {
        Self { start, end }
    }

    pub fn single(pos: CellPos) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn top(&self) -> usize {
        cmp::min(self.start.row, self.end.row)
    }

    pub fn bottom(&self) -> usize {
        cmp::max(self.start.row, self.end.row)
    }

    pub fn left(&self) -> usize {
        cmp::min(self.start.col, self.end.col)
    }

    pub fn right(&self) -> usize {
        cmp::max(self.start.col, self.end.col)
    }

    /// Same cells with `start` at the top-left corner
    pub fn normalized(&self) -> CellRange {
        CellRange {
            start: CellPos::new(self.top(), self.left()),
            end: CellPos::new(self.bottom(), self.right()),
        }
    }

    pub fn height(&self) -> usize {
        self.bottom() - self.top() + 1
    }

    pub fn width(&self) -> usize {
        self.right() - self.left() + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        (self.top()..=self.bottom()).contains(&pos.row) && (self.left()..=self.right()).contains(&pos.col)
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellPos> {
        let (left, right) = (self.left(), self.right());
        (self.top()..=self.bottom()).flat_map(move |r| (left..=right).map(move |c| CellPos::new(r, c)))
    }

    /// Intersect with a `rows` x `cols` sheet
    pub fn clip(&self, rows: usize, cols: usize) -> Option<CellRange> {
        if rows == 0 || cols == 0 || self.top() >= rows || self.left() >= cols {
            return None;
        }
        Some(CellRange {
            start: CellPos::new(self.top(), self.left()),
            end: CellPos::new(cmp::min(self.bottom(), rows - 1), cmp::min(self.right(), cols - 1)),
        })
    }
}

/// The one selection mode in effect
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Cell(CellPos),
    Range { active: CellPos, range: CellRange },
    Rows { rows: BTreeSet<usize>, anchor: usize },
    Column(usize),
}

impl Selection {
    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn active_cell(&self) -> Option<CellPos> {
        match self {
            Selection::Cell(pos) | Selection::Range { active: pos, .. } => Some(*pos),
            _ => None,
        }
    }

    /// Normalized range of a cell or range selection
    pub fn range(&self) -> Option<CellRange> {
        match self {
            Selection::Cell(pos) => Some(CellRange::single(*pos)),
            Selection::Range { range, .. } => Some(range.normalized()),
            _ => None,
        }
    }

    pub fn selected_rows(&self) -> Option<&BTreeSet<usize>> {
        match self {
            Selection::Rows { rows, .. } => Some(rows),
            _ => None,
        }
    }

    pub fn selected_column(&self) -> Option<usize> {
        match self {
            Selection::Column(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_row_selected(&self, row: usize) -> bool {
        self.selected_rows().map(|rows| rows.contains(&row)).unwrap_or(false)
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        match self {
            Selection::None => false,
            Selection::Cell(p) => *p == pos,
            Selection::Range { range, .. } => range.contains(pos),
            Selection::Rows { rows, .. } => rows.contains(&pos.row),
            Selection::Column(c) => *c == pos.col,
        }
    }
}

/// Owner of the selection. Every transition replaces the whole value and
/// reports whether anything observable changed, so repaints can be skipped.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    current: Selection,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &Selection {
        &self.current
    }

    pub fn set(&mut self, next: Selection) -> bool {
        if self.current == next {
            return false;
        }
        self.current = next;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.set(Selection::None)
    }

    pub fn select_cell(&mut self, pos: CellPos) -> bool {
        self.set(Selection::Cell(pos))
    }

    pub fn select_range(&mut self, start: CellPos, end: CellPos) -> bool {
        if start == end {
            return self.select_cell(start);
        }
        self.set(Selection::Range { active: start, range: CellRange::new(start, end) })
    }

    /// Move the free corner of the range, anchored at the active cell
    pub fn extend_range(&mut self, end: CellPos) -> bool {
        match &self.current {
            Selection::Cell(active) => {
                let active = *active;
                self.select_range(active, end)
            }
            Selection::Range { active, range } => {
                let (active, start) = (*active, range.start);
                if start == end {
                    return self.select_cell(start);
                }
                self.set(Selection::Range { active, range: CellRange::new(start, end) })
            }
            _ => self.select_cell(end),
        }
    }

    pub fn select_row(&mut self, row: usize) -> bool {
        self.set(Selection::Rows { rows: BTreeSet::from([row]), anchor: row })
    }

    /// Ctrl-click: flip membership of one row
    pub fn toggle_row(&mut self, row: usize) -> bool {
        match &self.current {
            Selection::Rows { rows, .. } => {
                let mut rows = rows.clone();
                if !rows.remove(&row) {
                    rows.insert(row);
                }
                if rows.is_empty() {
                    self.clear()
                } else {
                    self.set(Selection::Rows { rows, anchor: row })
                }
            }
            _ => self.select_row(row),
        }
    }

    /// Shift-click: contiguous span from the last anchor
    pub fn select_row_span(&mut self, row: usize) -> bool {
        let anchor = match &self.current {
            Selection::Rows { anchor, .. } => *anchor,
            _ => return self.select_row(row),
        };
        let rows = (cmp::min(anchor, row)..=cmp::max(anchor, row)).collect();
        self.set(Selection::Rows { rows, anchor })
    }

    pub fn select_column(&mut self, col: usize) -> bool {
        self.set(Selection::Column(col))
    }

    /// Drop whatever no longer fits a `rows` x `cols` sheet
    pub fn clamp(&mut self, rows: usize, cols: usize) -> bool {
        let fits = |p: &CellPos| p.row < rows && p.col < cols;
        let next = match &self.current {
            Selection::None => Selection::None,
            Selection::Cell(p) if fits(p) => Selection::Cell(*p),
            Selection::Range { active, range } if fits(active) => match range.clip(rows, cols) {
                Some(clipped) => Selection::Range { active: *active, range: clipped },
                None => Selection::Cell(*active),
            },
            Selection::Rows { rows: set, anchor } => {
                let kept: BTreeSet<usize> = set.iter().copied().filter(|&r| r < rows).collect();
                if kept.is_empty() {
                    Selection::None
                } else {
                    Selection::Rows { rows: kept, anchor: cmp::min(*anchor, rows - 1) }
                }
            }
            Selection::Column(c) if *c < cols => Selection::Column(*c),
            _ => Selection::None,
        };
        self.set(next)
    }
}
