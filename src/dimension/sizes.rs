use std::collections::{BTreeMap, BTreeSet};

/// Inclusive index interval of visible items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpan {
    pub first: usize,
    pub last: usize,
}

impl IndexSpan {
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.first <= idx && idx <= self.last
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.first..=self.last
    }
}

/// Sizes of a run of items (rows or columns) stored as a shared default
/// plus sparse per-index overrides.
///
/// Invariant: `total == offset(count)`, both read from the same cumulative index.
#[derive(Debug, Clone)]
pub struct SizeMap {
    count: usize,
    default: f64,
    overrides: BTreeMap<usize, f64>,
    /// Items sized by the user; auto-fit never touches them
    sticky: BTreeSet<usize>,
    total: f64,
    /// (index, Σ(override - default) over overrides up to and including index)
    cumulative: Vec<(usize, f64)>,
}

impl SizeMap {
    pub fn new(count: usize, default: f64) -> Self {
        Self {
            count,
            default,
            overrides: BTreeMap::new(),
            sticky: BTreeSet::new(),
            total: count as f64 * default,
            cumulative: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn default_size(&self) -> f64 {
        self.default
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_sticky(&self, idx: usize) -> bool {
        self.sticky.contains(&idx)
    }

    pub fn size(&self, idx: usize) -> f64 {
        self.overrides.get(&idx).copied().unwrap_or(self.default)
    }

    /// Set one item's size
    pub fn set(&mut self, idx: usize, size: f64) {
        if self.store(idx, size) {
            self.rebuild_cumulative();
        }
    }

    /// Set many sizes, rebuilding the offset index once
    pub fn set_many(&mut self, sizes: impl IntoIterator<Item = (usize, f64)>) {
        let mut changed = false;
        for (idx, size) in sizes {
            changed |= self.store(idx, size);
        }
        if changed {
            self.rebuild_cumulative();
        }
    }

    /// Set a size chosen by the user and pin it against auto-fit
    pub fn set_sticky(&mut self, idx: usize, size: f64) {
        if idx < self.count {
            self.sticky.insert(idx);
            self.set(idx, size);
        }
    }

    /// Release the auto-fit pin without touching the size
    pub fn unpin(&mut self, idx: usize) {
        self.sticky.remove(&idx);
    }

    /// Drop the override for one item
    pub fn clear(&mut self, idx: usize) {
        let default = self.default;
        self.set(idx, default);
    }

    fn store(&mut self, idx: usize, size: f64) -> bool {
        if idx >= self.count {
            return false;
        }
        let size = size.max(0.0);
        let old = self.size(idx);
        if old == size {
            return false;
        }
        if size == self.default {
            self.overrides.remove(&idx);
        } else {
            self.overrides.insert(idx, size);
        }
        true
    }

    fn rebuild_cumulative(&mut self) {
        let mut acc = 0.0;
        self.cumulative = self
            .overrides
            .iter()
            .map(|(&idx, &size)| {
                acc += size - self.default;
                (idx, acc)
            })
            .collect();
        self.total = self.offset(self.count);
    }

    /// Full recompute of the total and the offset index
    pub fn recompute(&mut self) {
        self.overrides.retain(|&idx, _| idx < self.count);
        self.sticky.retain(|&idx| idx < self.count);
        self.rebuild_cumulative();
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.recompute();
    }

    /// Forget every override and sticky flag
    pub fn reset(&mut self, count: usize) {
        self.overrides.clear();
        self.sticky.clear();
        self.count = count;
        self.recompute();
    }

    /// Make room for `n` items at `at`; overrides and sticky flags move with their items
    pub fn insert(&mut self, at: usize, n: usize) {
        let at = at.min(self.count);
        let moved = self.overrides.split_off(&at);
        self.overrides.extend(moved.into_iter().map(|(i, s)| (i + n, s)));
        let moved = self.sticky.split_off(&at);
        self.sticky.extend(moved.into_iter().map(|i| i + n));
        self.count += n;
        self.recompute();
    }

    /// Remove item `at`, shifting later overrides down
    pub fn remove(&mut self, at: usize) {
        if at >= self.count {
            return;
        }
        let moved = self.overrides.split_off(&at);
        self.overrides
            .extend(moved.into_iter().filter(|(i, _)| *i != at).map(|(i, s)| (i - 1, s)));
        let moved = self.sticky.split_off(&at);
        self.sticky.extend(moved.into_iter().filter(|i| *i != at).map(|i| i - 1));
        self.count -= 1;
        self.recompute();
    }

    /// Leading edge of item `idx` (also valid for `idx == count`, giving the total)
    pub fn offset(&self, idx: usize) -> f64 {
        let p = self.cumulative.partition_point(|(i, _)| *i < idx);
        let delta = if p == 0 { 0.0 } else { self.cumulative[p - 1].1 };
        idx as f64 * self.default + delta
    }

    /// First index in `0..count` for which `pred` is false, given `pred` is
    /// true on a prefix. Binary search keeps this independent of `count`.
    fn partition(&self, pred: impl Fn(usize) -> bool) -> usize {
        let (mut lo, mut hi) = (0usize, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(mid) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Item containing `pos`, if any
    pub fn index_at(&self, pos: f64) -> Option<usize> {
        if pos < 0.0 || pos >= self.total {
            return None;
        }
        let idx = self.partition(|i| self.offset(i) + self.size(i) <= pos);
        (idx < self.count).then_some(idx)
    }

    /// Minimal contiguous interval of items intersecting `[scroll, scroll + extent)`.
    /// `None` when nothing intersects.
    pub fn visible(&self, scroll: f64, extent: f64) -> Option<IndexSpan> {
        if self.count == 0 {
            return None;
        }
        let end = scroll + extent;
        // first item whose far edge lies past the scroll position
        let first = self.partition(|i| self.offset(i) + self.size(i) <= scroll);
        // one past the last item whose near edge lies before the far edge
        let past_last = self.partition(|i| self.offset(i) < end);
        if first >= past_last {
            None
        } else {
            Some(IndexSpan { first, last: past_last - 1 })
        }
    }
}
