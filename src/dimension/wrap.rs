//! Row auto-fit: estimate how many lines wrapped text needs.

use rayon::prelude::*;
use unicode_width::UnicodeWidthStr;

use super::sizes::SizeMap;
use crate::table::Table;

/// Threshold for using parallel processing (rows * wrap columns)
const PARALLEL_THRESHOLD: usize = 10_000;

/// Measures rendered text width. Supplied by whoever draws the text.
pub trait TextMeasure: Send + Sync {
    fn width(&self, text: &str) -> f64;
}

/// Fixed-pitch measurement based on unicode display width
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    pub char_width: f64,
}

impl TextMeasure for MonospaceMeasure {
    fn width(&self, text: &str) -> f64 {
        UnicodeWidthStr::width(text) as f64 * self.char_width
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FitMetrics {
    pub line_height: f64,
    pub padding: f64,
    pub default_height: f64,
}

impl FitMetrics {
    pub fn height_for(&self, lines: usize) -> f64 {
        (lines as f64 * self.line_height + self.padding).max(self.default_height)
    }
}

/// Number of lines `text` occupies when greedily word-wrapped into `available`
pub fn wrapped_line_count(text: &str, available: f64, measure: &dyn TextMeasure) -> usize {
    text.split('\n')
        .map(|para| paragraph_lines(para, available, measure))
        .sum::<usize>()
        .max(1)
}

fn paragraph_lines(para: &str, available: f64, measure: &dyn TextMeasure) -> usize {
    let mut lines = 0;
    let mut line = String::new();

    for word in para.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };
        if measure.width(&candidate) <= available {
            line = candidate;
            continue;
        }

        if !line.is_empty() {
            lines += 1;
        }
        let (full, rest) = break_word(word, available, measure);
        lines += full;
        line = rest;
    }

    lines + 1
}

/// Split a word wider than the cell by characters.
/// Returns the number of full lines and the trailing remainder.
fn break_word(word: &str, available: f64, measure: &dyn TextMeasure) -> (usize, String) {
    let mut full = 0;
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if measure.width(&current) > available && current.chars().count() > 1 {
            current.pop();
            full += 1;
            current = ch.to_string();
        }
    }
    (full, current)
}

/// Heights needed by `rows`, judged from their wrap-eligible cells.
///
/// Returns nothing when the schema has no wrapping column.
pub fn measure_rows(
    table: &Table,
    cols: &SizeMap,
    rows: &[usize],
    measure: &dyn TextMeasure,
    metrics: FitMetrics,
) -> Vec<(usize, f64)> {
    let wrap_cols: Vec<(&str, f64)> = table
        .schema()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.wraps())
        .map(|(i, c)| (c.key.as_str(), (cols.size(i) - metrics.padding).max(1.0)))
        .collect();

    if wrap_cols.is_empty() {
        return Vec::new();
    }

    let height_of = |row_idx: usize| -> (usize, f64) {
        let lines = table
            .get_row(row_idx)
            .map(|row| {
                wrap_cols
                    .iter()
                    .map(|(key, avail)| match row.get(key) {
                        Some(v) if !v.is_null() => wrapped_line_count(&v.to_string(), *avail, measure),
                        _ => 1,
                    })
                    .max()
                    .unwrap_or(1)
            })
            .unwrap_or(1);
        (row_idx, metrics.height_for(lines))
    };

    if rows.len() * wrap_cols.len() >= PARALLEL_THRESHOLD {
        rows.par_iter().map(|&r| height_of(r)).collect()
    } else {
        rows.iter().map(|&r| height_of(r)).collect()
    }
}
