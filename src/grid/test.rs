use super::*;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use crate::editor::{EditKey, EditorKind, OptionReply, OptionRequest, OptionResolver};
use crate::event::ContextTarget;
use crate::schema::DataType;

fn records(values: Vec<JsonValue>) -> Vec<Map<String, JsonValue>> {
    values
        .into_iter()
        .filter_map(|v| match v {
            JsonValue::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

fn people_schema() -> Schema {
    Schema::new(vec![
        ColumnDef::new("id", DataType::Number),
        ColumnDef::new("name", DataType::Text).required(),
        ColumnDef::new("active", DataType::Boolean),
    ])
    .unwrap()
}

fn people() -> Grid {
    Grid::with_records(
        people_schema(),
        records(vec![
            json!({"id": 1, "name": "Ada", "active": true}),
            json!({"id": 2, "name": "Brendan", "active": false}),
            json!({"id": 3, "name": "Grace", "active": true}),
        ]),
        GridConfig::default(),
    )
}

fn name_at(grid: &Grid, row: usize) -> String {
    grid.value(CellPos::new(row, 1)).unwrap().to_string()
}

/// Keeps every request so the test decides when (and whether) to answer
#[derive(Default)]
struct HeldResolver {
    pending: Mutex<Vec<(OptionRequest, OptionReply)>>,
}

impl HeldResolver {
    fn take(&self) -> Vec<(OptionRequest, OptionReply)> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }
}

impl OptionResolver for HeldResolver {
    fn resolve(&self, request: OptionRequest, reply: OptionReply) {
        self.pending.lock().unwrap().push((request, reply));
    }
}

fn city_options(query: &str) -> Vec<SelectOption> {
    [("ber", "Berlin"), ("bud", "Budapest"), ("par", "Paris")]
        .iter()
        .filter(|(_, label)| label.to_lowercase().contains(&query.to_lowercase()))
        .map(|(id, label)| SelectOption::new(*id, *label))
        .collect()
}

fn city_grid(resolver: Arc<HeldResolver>) -> Grid {
    let schema = Schema::new(vec![
        ColumnDef::new("name", DataType::Text),
        ColumnDef::new("city", DataType::Select).with_resolver(resolver),
    ])
    .unwrap();
    Grid::with_records(
        schema,
        records(vec![json!({"name": "a"}), json!({"name": "b"})]),
        GridConfig::default(),
    )
}

// === Selection ===

#[test]
fn test_selection_kinds_replace_each_other() {
    let mut grid = people();
    grid.click_cell(CellPos::new(0, 0), Modifiers::NONE);
    assert_eq!(grid.selection(), &Selection::Cell(CellPos::new(0, 0)));

    grid.click_cell(CellPos::new(2, 1), Modifiers::SHIFT);
    assert_eq!(grid.selection().range().map(|r| (r.height(), r.width())), Some((3, 2)));

    grid.click_row_header(1, Modifiers::NONE);
    assert!(grid.selection().is_row_selected(1));
    assert!(grid.selection().range().is_none());

    grid.click_column_header(2);
    assert_eq!(grid.selection().selected_column(), Some(2));
    assert!(grid.selection().selected_rows().is_none());
}

#[test]
fn test_move_active_stays_inside_grid() {
    let mut grid = people();
    grid.move_active(Direction::Down, false);
    assert_eq!(grid.selection().active_cell(), Some(CellPos::new(0, 0)));

    grid.move_active(Direction::Up, false);
    grid.move_active(Direction::Left, false);
    assert_eq!(grid.selection().active_cell(), Some(CellPos::new(0, 0)));

    for _ in 0..5 {
        grid.move_active(Direction::Right, false);
    }
    assert_eq!(grid.selection().active_cell(), Some(CellPos::new(0, 2)));

    grid.move_active(Direction::Down, true);
    assert_eq!(grid.selection().range().map(|r| r.height()), Some(2));
}

#[test]
fn test_pointer_drag_selects_range() {
    let mut grid = people();
    grid.set_viewport(0.0, 0.0, 800.0, 400.0);
    // row header 56 wide, header 32 tall, 120x30 cells
    assert!(grid.pointer_down(60.0, 40.0, Modifiers::NONE));
    grid.pointer_move(250.0, 100.0);
    grid.pointer_up();

    let range = grid.selection().range().unwrap();
    assert_eq!((range.top(), range.left(), range.bottom(), range.right()), (0, 0, 2, 1));
}

// === Row deletion and history ===

#[test]
fn test_ctrl_click_rows_delete_and_undo() {
    let mut grid = people();
    grid.click_row_header(0, Modifiers::NONE);
    grid.click_row_header(2, Modifiers::CTRL);
    assert_eq!(grid.selection().selected_rows().map(|r| r.len()), Some(2));

    assert_eq!(grid.delete_selected_rows().unwrap(), 2);
    assert_eq!(grid.row_count(), 1);
    assert_eq!(name_at(&grid, 0), "Brendan");
    assert!(grid.selection().is_none());

    assert!(grid.undo());
    assert_eq!(grid.row_count(), 3);
    assert_eq!(
        (0..3).map(|r| name_at(&grid, r)).collect::<Vec<_>>(),
        vec!["Ada", "Brendan", "Grace"]
    );

    assert!(grid.redo());
    assert_eq!(grid.row_count(), 1);
    assert_eq!(name_at(&grid, 0), "Brendan");
}

#[test]
fn test_undo_runs_in_reverse_order() {
    let mut grid = people();
    grid.update_cells(vec![CellUpdate::new(0, "name", "Ada L.")]).unwrap();
    grid.delete_rows(&[1]).unwrap();
    assert_eq!(grid.row_count(), 2);

    grid.undo();
    assert_eq!(grid.row_count(), 3);
    assert_eq!(name_at(&grid, 0), "Ada L.");

    grid.undo();
    assert_eq!(name_at(&grid, 0), "Ada");
    assert!(!grid.can_undo());

    // a fresh edit drops the redo branch
    assert!(grid.can_redo());
    grid.update_cells(vec![CellUpdate::new(2, "name", "Hopper")]).unwrap();
    assert!(!grid.can_redo());
    assert!(!grid.redo());
}

#[test]
fn test_undo_row_delete_restores_user_height() {
    let mut grid = people();
    grid.begin_row_resize(1, 0.0);
    grid.update_resize(50.0);
    grid.end_resize();
    let height = grid.dimensions().row_height(1);
    assert!(grid.dimensions().rows.is_sticky(1));

    grid.delete_rows(&[1]).unwrap();
    assert!(!grid.dimensions().rows.is_sticky(1));

    grid.undo();
    assert_eq!(grid.dimensions().row_height(1), height);
    assert!(grid.dimensions().rows.is_sticky(1));
    assert!(!grid.dimensions().rows.is_sticky(2));
}

#[test]
fn test_without_history_is_not_undoable() {
    let mut grid = people();
    grid.without_history(|g| g.add_row(None)).unwrap();
    assert_eq!(grid.row_count(), 4);
    assert!(!grid.can_undo());
}

#[test]
fn test_replace_rows_clears_history_and_selection() {
    let mut grid = people();
    grid.update_cells(vec![CellUpdate::new(0, "id", 10.0)]).unwrap();
    grid.click_cell(CellPos::new(1, 1), Modifiers::NONE);
    grid.copy();

    grid.replace_rows(records(vec![json!({"id": 7, "name": "Linus"})]));
    assert_eq!(grid.row_count(), 1);
    assert!(!grid.can_undo());
    assert!(grid.selection().is_none());
    assert!(grid.copy_buffer().is_empty());
}

#[test]
fn test_replace_rows_marks_missing_required() {
    let mut grid = people();
    grid.replace_rows(records(vec![json!({"id": 7}), json!({"id": "x", "name": "Linus"})]));

    let marker = grid.cell_error(CellPos::new(0, 1)).unwrap();
    assert!(marker.persistent);
    // values that fail their type are kept as given, without a marker
    assert_eq!(grid.value(CellPos::new(1, 0)), Some(CellValue::text("x")));
    assert!(grid.cell_error(CellPos::new(1, 0)).is_none());
}

// === Columns ===

#[test]
fn test_add_and_remove_column() {
    let mut grid = people();
    let col = ColumnDef::new("score", DataType::Number).with_default(0.0);
    assert_eq!(grid.add_column(1, col).unwrap(), 1);
    assert_eq!(grid.col_count(), 4);
    assert_eq!(grid.value(CellPos::new(2, 1)), Some(CellValue::Number(0.0)));
    assert_eq!(grid.dimensions().cols.count(), 4);

    let dup = grid.add_column(0, ColumnDef::new("score", DataType::Text));
    assert!(matches!(dup, Err(GridError::DuplicateColumn(_))));

    grid.remove_column_by_key("score").unwrap();
    assert_eq!(grid.col_count(), 3);

    grid.undo();
    assert_eq!(grid.schema().position("score"), Some(1));
    assert_eq!(grid.value(CellPos::new(0, 1)), Some(CellValue::Number(0.0)));
}

#[test]
fn test_fixed_column_cannot_be_removed() {
    let schema = Schema::new(vec![ColumnDef::new("id", DataType::Number).with_removable(false)]).unwrap();
    let mut grid = Grid::new(schema, GridConfig::default());
    assert!(matches!(grid.remove_column(0), Err(GridError::ColumnNotRemovable(_))));
    assert!(matches!(grid.remove_column(3), Err(GridError::ColumnOutOfBounds { .. })));
}

// === Programmatic updates ===

#[test]
fn test_update_cells_reports_per_cell() {
    let mut grid = people();
    let report = grid
        .update_cells(vec![
            CellUpdate::new(0, "id", "42"),
            CellUpdate::new(1, "active", "maybe"),
            CellUpdate::new(2, "id", 3.0),
        ])
        .unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.changed, 1);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].key, "active");
    assert_eq!(grid.value(CellPos::new(0, 0)), Some(CellValue::Number(42.0)));

    assert!(matches!(
        grid.update_cells(vec![CellUpdate::new(0, "nope", 1.0)]),
        Err(GridError::UnknownColumn(_))
    ));
    assert!(matches!(
        grid.update_cells(vec![CellUpdate::new(9, "id", 1.0)]),
        Err(GridError::RowOutOfBounds { .. })
    ));
}

#[test]
fn test_cells_updated_event_carries_previous_values() {
    let mut grid = people();
    grid.drain_events();
    grid.update_cells(vec![CellUpdate::new(1, "name", "Bob"), CellUpdate::new(1, "id", 20.0)])
        .unwrap();

    let events = grid.drain_events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        GridEvent::CellsUpdated { row, keys, snapshot, previous } => {
            assert_eq!(*row, 1);
            assert_eq!(keys, &vec!["name".to_string(), "id".to_string()]);
            assert_eq!(snapshot.get("name"), Some(&CellValue::text("Bob")));
            assert_eq!(previous.get("name"), Some(&CellValue::text("Brendan")));
            assert_eq!(previous.get("id"), Some(&CellValue::Number(2.0)));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

// === Fill ===

fn fill_grid() -> Grid {
    let schema = Schema::new(vec![
        ColumnDef::new("qty", DataType::Number),
        ColumnDef::new("locked", DataType::Boolean),
        ColumnDef::new("price", DataType::Number)
            .disabled_when(|v| v.get("locked").and_then(|l| l.as_bool()) == Some(true)),
    ])
    .unwrap();
    Grid::with_records(
        schema,
        records(vec![
            json!({"qty": 1, "locked": false, "price": 5}),
            json!({"qty": 2, "locked": true, "price": 6}),
            json!({"qty": 3, "locked": false, "price": 7}),
            json!({"qty": 4, "locked": false, "price": 8}),
        ]),
        GridConfig::default(),
    )
}

#[test]
fn test_fill_down_skips_disabled_cells() {
    let mut grid = fill_grid();
    grid.click_cell(CellPos::new(0, 2), Modifiers::NONE);
    assert!(grid.begin_fill());
    grid.update_fill(3);
    assert_eq!(grid.fill_preview(), Some((CellPos::new(0, 2), 3)));

    let report = grid.end_fill();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.changed, 2);
    let prices: Vec<_> = (0..4).map(|r| grid.value(CellPos::new(r, 2)).unwrap()).collect();
    assert_eq!(
        prices,
        vec![CellValue::Number(5.0), CellValue::Number(6.0), CellValue::Number(5.0), CellValue::Number(5.0)]
    );

    // one undo step for the whole fill
    grid.undo();
    assert_eq!(grid.value(CellPos::new(3, 2)), Some(CellValue::Number(8.0)));
}

#[test]
fn test_disabled_state_follows_pasted_values() {
    let mut grid = fill_grid();
    assert!(!grid.is_cell_disabled(CellPos::new(0, 2)));

    // lock row 0 and unlock row 1 in one paste
    grid.click_cell(CellPos::new(0, 1), Modifiers::NONE);
    grid.paste_text("true\nfalse").unwrap();
    assert!(grid.is_cell_disabled(CellPos::new(0, 2)));
    assert!(!grid.is_cell_disabled(CellPos::new(1, 2)));

    // a fill from row 3 up now skips row 0 and writes row 1
    grid.click_cell(CellPos::new(3, 2), Modifiers::NONE);
    grid.begin_fill();
    grid.update_fill(0);
    let report = grid.end_fill();
    assert_eq!(report.skipped, 1);
    assert_eq!(grid.value(CellPos::new(0, 2)), Some(CellValue::Number(5.0)));
    assert_eq!(grid.value(CellPos::new(1, 2)), Some(CellValue::Number(8.0)));

    // undoing the paste re-evaluates the predicate too
    grid.undo();
    grid.undo();
    assert!(!grid.is_cell_disabled(CellPos::new(0, 2)));
    assert!(grid.is_cell_disabled(CellPos::new(1, 2)));
}

#[test]
fn test_list_pick_recomputes_disabled() {
    let mut grid = fill_grid();
    grid.open_editor(CellPos::new(2, 1));
    let yes = grid.editor_options().iter().position(|o| o.id == "true").unwrap();
    assert!(grid.pick_option(yes));
    assert!(grid.is_cell_disabled(CellPos::new(2, 2)));
    assert!(!grid.open_editor(CellPos::new(2, 2)));
}

#[test]
fn test_fill_up_and_reverse_direction() {
    let mut grid = fill_grid();
    grid.click_cell(CellPos::new(3, 0), Modifiers::NONE);
    grid.begin_fill();
    grid.update_fill(0);
    grid.update_fill(2);
    grid.end_fill();

    let qty: Vec<_> = (0..4).map(|r| grid.value(CellPos::new(r, 0)).unwrap()).collect();
    assert_eq!(
        qty,
        vec![CellValue::Number(1.0), CellValue::Number(2.0), CellValue::Number(4.0), CellValue::Number(4.0)]
    );
}

#[test]
fn test_fill_with_mismatched_anchor_does_nothing() {
    let mut grid = Grid::with_records(
        people_schema(),
        records(vec![json!({"id": "oops", "name": "a"}), json!({"id": 2, "name": "b"})]),
        GridConfig::default(),
    );
    grid.click_cell(CellPos::new(0, 0), Modifiers::NONE);
    grid.begin_fill();
    grid.update_fill(1);
    assert_eq!(grid.end_fill(), UpdateReport::default());
    assert_eq!(grid.value(CellPos::new(1, 0)), Some(CellValue::Number(2.0)));
}

// === Copy and paste ===

#[test]
fn test_paste_coerces_into_target_columns() {
    let schema = Schema::new(vec![
        ColumnDef::new("when", DataType::Date),
        ColumnDef::new("note", DataType::Text),
        ColumnDef::new("count", DataType::Number),
        ColumnDef::new("flag", DataType::Boolean),
    ])
    .unwrap();
    let mut grid = Grid::with_records(
        schema,
        records(vec![json!({"when": "2024-03-01", "note": "42"}), json!({})]),
        GridConfig::default(),
    );

    // date to date survives the round trip
    grid.click_cell(CellPos::new(0, 0), Modifiers::NONE);
    grid.copy();
    grid.click_cell(CellPos::new(1, 0), Modifiers::NONE);
    grid.paste();
    assert_eq!(
        grid.value(CellPos::new(1, 0)),
        Some(CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
    );

    // numeric text lands as a number
    grid.click_cell(CellPos::new(0, 1), Modifiers::NONE);
    grid.copy();
    grid.click_cell(CellPos::new(0, 2), Modifiers::NONE);
    grid.paste();
    assert_eq!(grid.value(CellPos::new(0, 2)), Some(CellValue::Number(42.0)));

    // unparseable boolean is rejected and the cell keeps its value
    grid.click_cell(CellPos::new(0, 3), Modifiers::NONE);
    let report = grid.paste_text("maybe").unwrap();
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(grid.value(CellPos::new(0, 3)), Some(CellValue::Null));
}

#[test]
fn test_paste_tiles_over_larger_selection() {
    let mut grid = people();
    grid.click_cell(CellPos::new(0, 0), Modifiers::NONE);
    grid.copy();
    grid.click_column_header(0);
    let report = grid.paste();
    assert_eq!(report.accepted, 3);
    assert!((0..3).all(|r| grid.value(CellPos::new(r, 0)) == Some(CellValue::Number(1.0))));
}

#[test]
fn test_paste_block_clips_at_edge() {
    let mut grid = people();
    grid.click_cell(CellPos::new(2, 1), Modifiers::NONE);
    let report = grid.paste_text("Zed\ttrue\textra\nYan\tfalse\textra").unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(name_at(&grid, 2), "Zed");
    assert_eq!(grid.value(CellPos::new(2, 2)), Some(CellValue::Bool(true)));
}

#[test]
fn test_copy_rows_to_tsv() {
    let mut grid = people();
    grid.click_row_header(1, Modifiers::NONE);
    assert!(grid.copy());
    assert_eq!(grid.copy_buffer().shape(), (1, 3));
    assert_eq!(grid.copy_buffer().to_tsv().unwrap(), "2\tBrendan\tfalse");
}

// === Editing ===

#[test]
fn test_text_edit_commits_and_moves_down() {
    let mut grid = people();
    assert!(grid.open_editor(CellPos::new(0, 1)));
    assert_eq!(grid.editor().kind(), Some(EditorKind::Text));
    grid.editor_key(EditKey::Char('!'));
    grid.editor_key(EditKey::Enter);

    assert!(grid.editor().is_idle());
    assert_eq!(name_at(&grid, 0), "Ada!");
    assert_eq!(grid.selection().active_cell(), Some(CellPos::new(1, 1)));
}

#[test]
fn test_tab_wraps_to_next_row() {
    let mut grid = people();
    grid.open_editor(CellPos::new(0, 2));
    // boolean editor is a list; Tab commits the highlighted option
    grid.editor_key(EditKey::Tab);
    assert_eq!(grid.selection().active_cell(), Some(CellPos::new(1, 0)));
}

#[test]
fn test_escape_restores_prior_selection() {
    let mut grid = people();
    grid.click_row_header(2, Modifiers::NONE);
    grid.open_editor(CellPos::new(0, 1));
    grid.editor_key(EditKey::Backspace);
    grid.editor_key(EditKey::Escape);

    assert_eq!(name_at(&grid, 0), "Ada");
    assert!(grid.selection().is_row_selected(2));
}

#[test]
fn test_rejected_edit_marks_cell() {
    let mut grid = people();
    let t0 = Instant::now();
    grid.tick(t0);

    grid.open_editor(CellPos::new(0, 0));
    grid.editor_key(EditKey::Char('x'));
    grid.editor_key(EditKey::Enter);
    assert_eq!(grid.value(CellPos::new(0, 0)), Some(CellValue::Number(1.0)));
    assert!(grid.editor().is_idle());
    assert_eq!(grid.selection().active_cell(), Some(CellPos::new(0, 0)));
    let marker = grid.cell_error(CellPos::new(0, 0)).unwrap();
    assert!(!marker.persistent);

    // a required violation outlives the timeout
    grid.open_editor(CellPos::new(1, 1));
    for _ in 0.."Brendan".len() {
        grid.editor_key(EditKey::Backspace);
    }
    grid.editor_key(EditKey::Enter);
    assert!(grid.cell_error(CellPos::new(1, 1)).unwrap().persistent);

    grid.tick(t0 + grid.config().transient_error_ttl() + Duration::from_millis(1));
    assert!(grid.cell_error(CellPos::new(0, 0)).is_none());
    assert!(grid.cell_error(CellPos::new(1, 1)).is_some());
}

#[test]
fn test_editor_refuses_readonly_and_loading() {
    let schema = Schema::new(vec![
        ColumnDef::new("id", DataType::Number).readonly(),
        ColumnDef::new("name", DataType::Text),
    ])
    .unwrap();
    let mut grid = Grid::with_records(schema, records(vec![json!({"id": 1, "name": "a"})]), GridConfig::default());
    assert!(!grid.open_editor(CellPos::new(0, 0)));

    grid.set_cell_loading(CellPos::new(0, 1), true).unwrap();
    assert!(!grid.open_editor(CellPos::new(0, 1)));
    grid.set_cell_loading(CellPos::new(0, 1), false).unwrap();
    assert!(grid.open_editor(CellPos::new(0, 1)));
}

#[test]
fn test_boolean_list_picks_null_when_nullable() {
    let mut grid = people();
    grid.open_editor(CellPos::new(0, 2));
    let labels: Vec<_> = grid.editor_options().into_iter().map(|o| o.label).collect();
    assert_eq!(labels, vec!["", "Yes", "No"]);

    assert!(grid.pick_option(0));
    assert_eq!(grid.value(CellPos::new(0, 2)), Some(CellValue::Null));
}

#[test]
fn test_static_select_filters_and_commits_id() {
    let schema = Schema::new(vec![ColumnDef::new("size", DataType::Select).with_nullable(false).with_options(vec![
        SelectOption::new("s", "Small"),
        SelectOption::new("m", "Medium"),
        SelectOption::new("l", "Large"),
    ])])
    .unwrap();
    let mut grid = Grid::with_records(schema, records(vec![json!({"size": "s"})]), GridConfig::default());
    grid.open_editor(CellPos::new(0, 0));
    grid.set_search_query("lar");
    assert_eq!(grid.editor_options().len(), 1);
    grid.editor_key(EditKey::Enter);
    assert_eq!(grid.value(CellPos::new(0, 0)), Some(CellValue::text("l")));
}

#[test]
fn test_custom_editor_commits_through_reentry() {
    let schema = Schema::new(vec![ColumnDef::new("when", DataType::Date).with_custom_editor("calendar")]).unwrap();
    let mut grid = Grid::with_records(schema, records(vec![json!({})]), GridConfig::default());
    grid.open_editor(CellPos::new(0, 0));
    assert_eq!(grid.editor().kind(), Some(EditorKind::Custom));
    assert!(!grid.editor_key(EditKey::Enter));

    assert!(grid.commit_custom(CellValue::text("2023-12-24")));
    assert_eq!(
        grid.value(CellPos::new(0, 0)),
        Some(CellValue::Date(NaiveDate::from_ymd_opt(2023, 12, 24).unwrap()))
    );
    assert!(grid.editor().is_idle());
}

#[test]
fn test_editor_events() {
    let mut grid = people();
    grid.drain_events();
    grid.open_editor(CellPos::new(0, 1));
    grid.editor_key(EditKey::Escape);
    let events = grid.drain_events();
    assert!(events.contains(&GridEvent::EditorOpened { pos: CellPos::new(0, 1), kind: EditorKind::Text }));
    assert!(events.contains(&GridEvent::EditorClosed { pos: CellPos::new(0, 1), committed: false }));
}

// === Async options ===

#[test]
fn test_stale_option_results_are_dropped() {
    let resolver = Arc::new(HeldResolver::default());
    let mut grid = city_grid(resolver.clone());
    let t0 = Instant::now();
    grid.tick(t0);

    grid.open_editor(CellPos::new(0, 1));
    assert!(grid.editor().list().unwrap().is_loading());
    let first = resolver.take();
    assert_eq!(first.len(), 1);

    grid.editor_key(EditKey::Char('b'));
    grid.tick(t0 + grid.config().search_debounce());
    let second = resolver.take();
    assert_eq!(second[0].0.query, "b");

    // the older request answers last-but-stale
    for (req, reply) in second {
        reply.send(Ok(city_options(&req.query)));
    }
    for (req, reply) in first {
        assert!(reply.is_cancelled());
        reply.send(Ok(city_options(&req.query)));
    }
    grid.tick(t0 + grid.config().search_debounce());

    let ids: Vec<_> = grid.editor_options().into_iter().map(|o| o.id).collect();
    assert_eq!(ids, vec!["", "ber", "bud"]);
}

#[test]
fn test_search_is_debounced() {
    let resolver = Arc::new(HeldResolver::default());
    let mut grid = city_grid(resolver.clone());
    let t0 = Instant::now();
    grid.tick(t0);
    grid.open_editor(CellPos::new(1, 1));
    resolver.take();

    grid.editor_key(EditKey::Char('p'));
    grid.tick(t0 + Duration::from_millis(10));
    grid.editor_key(EditKey::Char('a'));
    grid.tick(t0 + Duration::from_millis(20));
    assert!(resolver.take().is_empty());

    grid.tick(t0 + Duration::from_millis(20) + grid.config().search_debounce());
    let requests = resolver.take();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0.query, "pa");
}

#[test]
fn test_reply_arriving_during_debounce_is_dropped() {
    let resolver = Arc::new(HeldResolver::default());
    let mut grid = city_grid(resolver.clone());
    let t0 = Instant::now();
    grid.tick(t0);
    grid.open_editor(CellPos::new(0, 1));
    let first = resolver.take();

    grid.editor_key(EditKey::Char('p'));
    for (req, reply) in first {
        reply.send(Ok(city_options(&req.query)));
    }
    grid.tick(t0 + Duration::from_millis(10));

    let list = grid.editor().list().unwrap();
    assert!(list.is_loading());
    assert!(list.search_pending());
    assert!(list.options().is_empty());

    grid.tick(t0 + grid.config().search_debounce());
    for (req, reply) in resolver.take() {
        reply.send(Ok(city_options(&req.query)));
    }
    grid.poll_options();
    let ids: Vec<_> = grid.editor_options().into_iter().map(|o| o.id).collect();
    assert_eq!(ids, vec!["", "bud", "par"]);
    assert!(!grid.editor().list().unwrap().is_loading());
}

#[test]
fn test_resolved_option_commits_and_is_cached() {
    let resolver = Arc::new(HeldResolver::default());
    let mut grid = city_grid(resolver.clone());
    grid.open_editor(CellPos::new(0, 1));
    for (req, reply) in resolver.take() {
        reply.send(Ok(city_options(&req.query)));
    }
    grid.poll_options();
    // blank, Berlin, Budapest, Paris
    assert!(grid.pick_option(3));
    assert_eq!(grid.value(CellPos::new(0, 1)), Some(CellValue::text("par")));

    // paste can now map a label through the cache, on the same row only
    grid.click_cell(CellPos::new(0, 1), Modifiers::NONE);
    grid.paste_text("Berlin").unwrap();
    assert_eq!(grid.value(CellPos::new(0, 1)), Some(CellValue::text("ber")));

    grid.click_cell(CellPos::new(1, 1), Modifiers::NONE);
    let report = grid.paste_text("Berlin").unwrap();
    assert_eq!(report.rejected[0].error, ValidationError::NoTextConversion);
    assert_eq!(grid.value(CellPos::new(1, 1)), Some(CellValue::Null));

    // rows shifting forgets what was resolved
    grid.add_row(Some(0)).unwrap();
    grid.click_cell(CellPos::new(1, 1), Modifiers::NONE);
    assert_eq!(grid.paste_text("Paris").unwrap().accepted, 0);
}

#[test]
fn test_closing_editor_cancels_request() {
    let resolver = Arc::new(HeldResolver::default());
    let mut grid = city_grid(resolver.clone());
    grid.open_editor(CellPos::new(0, 1));
    grid.cancel_editor();
    let held = resolver.take();
    assert!(held.iter().all(|(_, reply)| reply.is_cancelled()));
}

// === Layout ===

#[test]
fn test_column_resize_clamps_and_cancels() {
    let mut grid = people();
    grid.begin_column_resize(0, 100.0);
    grid.update_resize(-500.0);
    assert_eq!(grid.dimensions().column_width(0), grid.config().min_col_width);
    grid.update_resize(5000.0);
    assert_eq!(grid.dimensions().column_width(0), grid.config().max_col_width);

    grid.cancel_resize();
    assert_eq!(grid.dimensions().column_width(0), grid.config().default_col_width);
    assert!(!grid.dimensions().cols.is_sticky(0));
}

#[test]
fn test_visible_range_follows_viewport() {
    let mut grid = people();
    grid.set_viewport(0.0, 0.0, 56.0 + 130.0, 32.0 + 45.0);
    let range = grid.visible_range();
    assert_eq!(range.rows.map(|s| (s.first, s.last)), Some((0, 1)));
    assert_eq!(range.cols.map(|s| (s.first, s.last)), Some((0, 1)));

    grid.set_viewport(0.0, 500.0, 400.0, 200.0);
    assert!(grid.visible_range().rows.is_none());
}

#[test]
fn test_context_menu_on_row_header() {
    let mut grid = people();
    grid.set_viewport(0.0, 0.0, 800.0, 400.0);
    grid.drain_events();
    assert!(grid.context_menu(10.0, 80.0));
    assert_eq!(
        grid.drain_events(),
        vec![GridEvent::ContextMenu { target: ContextTarget::RowHeader(1), x: 10.0, y: 80.0 }]
    );
    assert!(!grid.context_menu(10.0, 10.0));
}

// === Export ===

#[test]
fn test_export_options() {
    let mut grid = people();
    // a fresh row leaves the required name empty
    grid.add_row(None).unwrap();

    let all = grid.export(ExportOptions::default());
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].get("id"), Some(&json!(1.0)));
    assert!(all[0].get(SHADOW_KEY).is_none());

    let valid = grid.export(ExportOptions { skip_invalid: true, ..Default::default() });
    assert_eq!(valid.len(), 3);

    grid.set_cell_loading(CellPos::new(0, 0), true).unwrap();
    let shadowed = grid.export(ExportOptions { include_shadow: true, ..Default::default() });
    assert_eq!(shadowed[0][SHADOW_KEY]["id"]["loading"], json!(true));

    grid.set_viewport(0.0, 0.0, 56.0 + 100.0, 200.0);
    let narrow = grid.export(ExportOptions { visible_columns_only: true, ..Default::default() });
    assert_eq!(narrow[0].len(), 1);
}
