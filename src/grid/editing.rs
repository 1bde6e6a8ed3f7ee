//! Editor activation, key handling, commits and async option lookup.

use tracing::{debug, warn};

use super::Grid;
use crate::editor::{
    CustomSession, EditKey, EditTarget, EditorKind, EditorState, KeyOutcome, ListSession, Move, OptionList,
    OptionRequest, TextSession,
};
use crate::event::GridEvent;
use crate::schema::{DataType, OptionSource, SelectOption};
use crate::selection::CellPos;
use crate::value::CellValue;

impl Grid {
    /// Open the editor matching the column at `pos`. Disabled, loading and
    /// readonly cells are a silent no-op. An already open editor is committed first.
    pub fn open_editor(&mut self, pos: CellPos) -> bool {
        if !self.in_bounds(pos) || self.editor.target().map(|t| t.pos) == Some(pos) {
            return false;
        }
        if !self.editor.is_idle() {
            self.commit_editor();
        }

        let Some(column) = self.schema().column(pos.col).cloned() else {
            return false;
        };
        let Some(row) = self.table.get_row(pos.row) else {
            return false;
        };
        if column.readonly || row.is_disabled(&column.key) || row.is_loading(&column.key) {
            debug!(?pos, "editor activation refused");
            return false;
        }

        let original = row.value(&column.key);
        let prior = self.selection.get().clone();
        if self.selection.select_cell(pos) {
            self.emit_selected(pos);
        }
        let target = EditTarget { pos, key: column.key.clone(), original: original.clone(), prior };
        let nullable = column.nullable && !column.required;

        let mut remote = false;
        self.editor = if let Some(editor) = &column.editor {
            EditorState::Custom(CustomSession { target, editor: editor.clone() })
        } else if column.data_type == DataType::Boolean {
            EditorState::List(ListSession { target, list: OptionList::boolean(nullable, self.jobs.next()) })
        } else if column.data_type == DataType::Select {
            let list = match &column.options {
                Some(OptionSource::Resolver(_)) => {
                    remote = true;
                    OptionList::remote(nullable, self.jobs.next())
                }
                Some(OptionSource::Static(opts)) => OptionList::local(opts.clone(), nullable, self.jobs.next()),
                None => OptionList::local(Vec::new(), nullable, self.jobs.next()),
            };
            EditorState::List(ListSession { target, list })
        } else {
            EditorState::Text(TextSession::new(target, original.to_string()))
        };

        let kind = self.editor.kind().unwrap_or(EditorKind::Text);
        self.events.push(GridEvent::EditorOpened { pos, kind });
        if remote {
            self.request_options();
            self.poll_options();
        }
        true
    }

    /// Feed a key to the open editor. Returns false when no editor consumed it.
    pub fn editor_key(&mut self, key: EditKey) -> bool {
        let outcome = match &mut self.editor {
            EditorState::Idle => return false,
            EditorState::Text(session) => session.handle_key(key),
            EditorState::List(session) => session.handle_key(key),
            EditorState::Custom(_) if key == EditKey::Escape => KeyOutcome::Cancel,
            EditorState::Custom(_) => return false,
        };
        match outcome {
            KeyOutcome::Continue => {}
            KeyOutcome::Cancel => {
                self.cancel_editor();
            }
            KeyOutcome::Commit(mv) => {
                self.commit_with_move(mv);
            }
            KeyOutcome::QueryChanged => self.schedule_search(),
        }
        true
    }

    /// Commit whatever the open editor holds and close it.
    /// A list with no pick and a custom editor that has not reported close unchanged.
    pub fn commit_editor(&mut self) -> bool {
        match self.editor {
            EditorState::Idle => false,
            EditorState::Text(_) => self.commit_with_move(Move::Stay),
            EditorState::List(_) | EditorState::Custom(_) => {
                self.close_editor(false);
                false
            }
        }
    }

    /// Discard the edit and restore the selection from before the editor opened
    pub fn cancel_editor(&mut self) -> bool {
        let Some(target) = self.close_editor(false) else {
            return false;
        };
        self.selection.set(target.prior);
        true
    }

    /// Close without committing, e.g. when the row under the editor moved
    pub(crate) fn abandon_editor(&mut self) {
        self.close_editor(false);
    }

    fn close_editor(&mut self, committed: bool) -> Option<EditTarget> {
        let target = self.editor.take().target().cloned()?;
        // supersede any request still in flight
        self.jobs.next();
        self.events.push(GridEvent::EditorClosed { pos: target.pos, committed });
        Some(target)
    }

    fn commit_with_move(&mut self, mv: Move) -> bool {
        let (target, committed) = match self.editor.take() {
            EditorState::Text(session) => {
                let text = CellValue::Text(session.buffer.text().to_string());
                let committed = self.commit_value(&session.target, text);
                (session.target, committed)
            }
            EditorState::List(session) => {
                let committed = match session.list.highlighted_option() {
                    Some(option) => self.commit_option(&session.target, &option),
                    None => false,
                };
                (session.target, committed)
            }
            other => {
                self.editor = other;
                return false;
            }
        };

        self.jobs.next();
        self.events.push(GridEvent::EditorClosed { pos: target.pos, committed });
        if committed {
            let next = self.step(target.pos, mv);
            if self.selection.select_cell(next) {
                self.emit_selected(next);
            }
        }
        committed
    }

    /// Write through the shared coercion path; a rejection marks the cell
    fn commit_value(&mut self, target: &EditTarget, value: CellValue) -> bool {
        let report = self.write_cells(vec![(target.pos.row, target.pos.col, value)], true);
        if let Some(rejected) = report.rejected.first() {
            let error = rejected.error.clone();
            debug!(pos = ?target.pos, %error, "edit rejected");
            self.set_error(target.pos, &error);
            return false;
        }
        report.accepted > 0
    }

    fn commit_option(&mut self, target: &EditTarget, option: &SelectOption) -> bool {
        let value = if option.is_blank() { CellValue::Null } else { CellValue::Text(option.id.clone()) };
        self.commit_value(target, value)
    }

    /// Next active cell after a commit; Tab wraps across rows at the sheet edge
    fn step(&self, pos: CellPos, mv: Move) -> CellPos {
        let (rows, cols) = (self.row_count(), self.col_count());
        match mv {
            Move::Stay => pos,
            Move::Down if pos.row + 1 < rows => CellPos::new(pos.row + 1, pos.col),
            Move::Right if pos.col + 1 < cols => CellPos::new(pos.row, pos.col + 1),
            Move::Right if pos.row + 1 < rows => CellPos::new(pos.row + 1, 0),
            Move::Left if pos.col > 0 => CellPos::new(pos.row, pos.col - 1),
            Move::Left if pos.row > 0 => CellPos::new(pos.row - 1, cols - 1),
            _ => pos,
        }
    }

    // === List editing ===

    /// Options the open list editor currently shows
    pub fn editor_options(&self) -> Vec<SelectOption> {
        self.editor.list().map(|l| l.visible()).unwrap_or_default()
    }

    pub fn set_search_query(&mut self, query: &str) -> bool {
        let Some(list) = self.editor.list_mut() else {
            return false;
        };
        list.set_query(query);
        self.schedule_search();
        true
    }

    /// Pick the option at `idx` of the visible list and commit it
    pub fn pick_option(&mut self, idx: usize) -> bool {
        let Some(list) = self.editor.list_mut() else {
            return false;
        };
        if idx >= list.visible().len() {
            return false;
        }
        list.highlight(idx);
        self.commit_with_move(Move::Stay)
    }

    fn schedule_search(&mut self) {
        if !self.editor.list().map(|l| l.is_remote()).unwrap_or(false) {
            return;
        }
        let (now, delay) = (self.now, self.config.search_debounce());
        let job = self.jobs.next();
        if let Some(list) = self.editor.list_mut() {
            list.schedule_search(now, delay, job);
        }
    }

    /// Ask the column's resolver for options under a fresh job id
    pub(crate) fn request_options(&mut self) {
        let Some(target) = self.editor.target().cloned() else {
            return;
        };
        let Some(resolver) = self.schema().column_by_key(&target.key).and_then(|c| c.resolver()).cloned() else {
            return;
        };
        let job = self.jobs.next();
        let Some(list) = self.editor.list_mut() else {
            return;
        };
        list.begin_request(job);
        let query = list.query().to_string();

        let values = self.table.get_row(target.pos.row).map(|r| r.values.clone()).unwrap_or_default();
        let reply = self.jobs.reply(job, self.replies_tx.clone());
        debug!(job, column = %target.key, %query, "requesting options");
        resolver.resolve(OptionRequest { row: target.pos.row, column: target.key, values, query }, reply);
    }

    /// Apply resolver replies that are still current; drop the rest
    pub fn poll_options(&mut self) -> bool {
        let mut dirty = false;
        while let Ok(response) = self.replies_rx.try_recv() {
            let waiting = self.editor.list().map(|l| l.job() == response.job).unwrap_or(false);
            if !waiting || !self.jobs.is_current(response.job) {
                debug!(job = response.job, "discarding stale option result");
                continue;
            }
            let options = match response.result {
                Ok(options) => options,
                Err(e) => {
                    warn!("option resolver failed: {}", e);
                    Vec::new()
                }
            };
            if let Some(cell) = self.editor.target().map(|t| (t.pos.row, t.key.clone())) {
                let cache = self.option_cache.entry(cell).or_default();
                for option in &options {
                    if !cache.iter().any(|o| o.id == option.id) {
                        cache.push(option.clone());
                    }
                }
            }
            if let Some(list) = self.editor.list_mut() {
                dirty |= list.receive(response.job, options);
            }
        }
        dirty
    }

    // === Custom editors ===

    /// Single re-entry point for an external editor to report its value
    pub fn commit_custom(&mut self, value: CellValue) -> bool {
        let EditorState::Custom(session) = self.editor.take() else {
            return false;
        };
        let committed = self.commit_value(&session.target, value);
        self.jobs.next();
        self.events.push(GridEvent::EditorClosed { pos: session.target.pos, committed });
        committed
    }

    pub fn cancel_custom(&mut self) -> bool {
        matches!(self.editor, EditorState::Custom(_)) && self.cancel_editor()
    }
}
