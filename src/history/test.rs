use super::*;

use crate::schema::{ColumnDef, DataType, Schema};
use crate::table::{Row, Table};
use crate::value::CellValue;

fn make_table(names: &[&str]) -> Table {
    let schema = Schema::new(vec![
        ColumnDef::new("name", DataType::Text),
        ColumnDef::new("n", DataType::Number),
    ])
    .unwrap();
    let rows = names
        .iter()
        .map(|s| Row::new([("name".to_string(), CellValue::text(*s))].into()))
        .collect();
    Table::new(schema, rows)
}

fn names(table: &Table) -> Vec<String> {
    table.rows_iter().map(|r| r.value("name").to_string()).collect()
}

fn set_name(row: usize, old: &str, new: &str) -> HistoryEntry {
    HistoryEntry::CellBatch(vec![CellChange {
        row,
        key: "name".into(),
        old: CellValue::text(old),
        new: CellValue::text(new),
    }])
}

// === Entry tests ===

#[test]
fn test_cell_batch_apply_and_inverse() {
    let mut table = make_table(&["a", "b"]);
    let entry = set_name(1, "b", "x");
    entry.apply(&mut table).unwrap();
    assert_eq!(names(&table), vec!["a", "x"]);

    entry.inverse().apply(&mut table).unwrap();
    assert_eq!(names(&table), vec!["a", "b"]);
}

#[test]
fn test_cell_batch_unknown_column_errors() {
    let mut table = make_table(&["a"]);
    let entry = HistoryEntry::CellBatch(vec![CellChange {
        row: 0,
        key: "nope".into(),
        old: CellValue::Null,
        new: CellValue::Null,
    }]);
    assert!(entry.apply(&mut table).is_err());
}

#[test]
fn test_row_delete_inverse_restores_order() {
    let mut table = make_table(&["a", "b", "c", "d"]);
    let rows = [0usize, 2]
        .iter()
        .map(|&i| (i, table.get_row(i).unwrap().clone()))
        .collect();
    let entry = HistoryEntry::RowDelete { rows, layout: Vec::new() };

    entry.apply(&mut table).unwrap();
    assert_eq!(names(&table), vec!["b", "d"]);

    entry.inverse().apply(&mut table).unwrap();
    assert_eq!(names(&table), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_column_delete_roundtrip_keeps_values() {
    let mut table = make_table(&["a", "b"]);
    table.set_value(1, "n", CellValue::Number(7.0));
    let (column, values) = table.remove_column(1).unwrap();
    let entry = HistoryEntry::ColumnDelete { index: 1, column, values };

    entry.inverse().apply(&mut table).unwrap();
    assert_eq!(table.col_count(), 2);
    assert_eq!(table.get_value(1, "n"), Some(&CellValue::Number(7.0)));

    entry.apply(&mut table).unwrap();
    assert_eq!(table.col_count(), 1);
}

#[test]
fn test_batch_inverse_reverses_order() {
    let entry = HistoryEntry::CellBatch(vec![
        CellChange { row: 0, key: "name".into(), old: "a".into(), new: "b".into() },
        CellChange { row: 0, key: "name".into(), old: "b".into(), new: "c".into() },
    ]);
    let mut table = make_table(&["a"]);
    entry.apply(&mut table).unwrap();
    assert_eq!(names(&table), vec!["c"]);
    entry.inverse().apply(&mut table).unwrap();
    assert_eq!(names(&table), vec!["a"]);
}

// === History tests ===

#[test]
fn test_history_record_and_undo() {
    let mut history = History::new(10);
    history.record(set_name(0, "a", "b"));
    assert!(history.can_undo());
    assert!(!history.can_redo());

    let undo = history.undo().unwrap();
    assert!(matches!(&undo, HistoryEntry::CellBatch(c) if c[0].new == CellValue::text("a")));
    assert!(history.can_redo());
}

#[test]
fn test_history_new_record_clears_redo() {
    let mut history = History::new(10);
    history.record(set_name(0, "a", "b"));
    history.record(set_name(0, "b", "c"));
    history.undo();
    assert!(history.can_redo());

    history.record(set_name(0, "b", "z"));
    assert!(!history.can_redo());
    assert_eq!(history.undo_len(), 2);
}

#[test]
fn test_history_redo_pushes_back() {
    let mut history = History::new(10);
    history.record(set_name(0, "a", "b"));
    history.undo();
    let redo = history.redo().unwrap();
    assert!(matches!(&redo, HistoryEntry::CellBatch(c) if c[0].new == CellValue::text("b")));
    assert!(history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn test_history_evicts_oldest() {
    let mut history = History::new(3);
    for i in 0..5 {
        history.record(set_name(0, &i.to_string(), &(i + 1).to_string()));
    }
    assert_eq!(history.undo_len(), 3);
    let oldest_kept = (0..3).filter_map(|_| history.undo()).last().unwrap();
    // inverse of the 2 -> 3 change
    assert!(matches!(&oldest_kept, HistoryEntry::CellBatch(c) if c[0].new == CellValue::text("2")));
    assert!(!history.can_undo());
}

#[test]
fn test_history_suspended_does_not_record() {
    let mut history = History::new(10);
    history.suspend();
    assert!(!history.record(set_name(0, "a", "b")));
    history.resume();
    assert!(history.record(set_name(0, "a", "b")));
    assert!(!history.record(HistoryEntry::CellBatch(vec![])));
}
