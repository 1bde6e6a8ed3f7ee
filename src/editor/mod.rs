//! Per-cell editing state machine.
//!
//! `Idle -> Text | List | Custom -> Idle`. The grid owns the state and
//! performs commits; sessions here only buffer input and report what a key
//! asks for.

pub mod list;
pub mod resolver;
pub mod text;


pub use list::OptionList;
pub use resolver::{JobCounter, OptionReply, OptionRequest, OptionResolver, OptionResponse};
pub use text::TextBuffer;

use crate::selection::{CellPos, Selection};
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Text,
    List,
    Custom,
}

/// Semantic keys the input router feeds to an open editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Enter,
    Tab,
    ShiftTab,
    Escape,
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    WordLeft,
    WordRight,
    Home,
    End,
    Up,
    Down,
}

/// Where the active cell goes after a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Stay,
    Down,
    Right,
    Left,
}

/// What a key asks the grid to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Commit(Move),
    Cancel,
    /// The search query changed
    QueryChanged,
}

/// The cell a session edits and what to restore on cancel
#[derive(Debug, Clone, PartialEq)]
pub struct EditTarget {
    pub pos: CellPos,
    pub key: String,
    pub original: CellValue,
    pub prior: Selection,
}

#[derive(Debug, Clone)]
pub struct TextSession {
    pub target: EditTarget,
    pub buffer: TextBuffer,
}

impl TextSession {
    pub fn new(target: EditTarget, initial: impl Into<String>) -> Self {
        Self { target, buffer: TextBuffer::new(initial) }
    }

    pub fn handle_key(&mut self, key: EditKey) -> KeyOutcome {
        match key {
            EditKey::Enter => return KeyOutcome::Commit(Move::Down),
            EditKey::Tab => return KeyOutcome::Commit(Move::Right),
            EditKey::ShiftTab => return KeyOutcome::Commit(Move::Left),
            EditKey::Escape => return KeyOutcome::Cancel,
            EditKey::Char(c) => self.buffer.insert(c),
            EditKey::Backspace => self.buffer.backspace(),
            EditKey::Delete => self.buffer.delete(),
            EditKey::Left => self.buffer.left(),
            EditKey::Right => self.buffer.right(),
            EditKey::WordLeft => self.buffer.word_left(),
            EditKey::WordRight => self.buffer.word_right(),
            EditKey::Home | EditKey::Up => self.buffer.home(),
            EditKey::End | EditKey::Down => self.buffer.end(),
        }
        KeyOutcome::Continue
    }
}

#[derive(Debug, Clone)]
pub struct ListSession {
    pub target: EditTarget,
    pub list: OptionList,
}

impl ListSession {
    pub fn handle_key(&mut self, key: EditKey) -> KeyOutcome {
        match key {
            EditKey::Enter => KeyOutcome::Commit(Move::Stay),
            EditKey::Tab => KeyOutcome::Commit(Move::Right),
            EditKey::ShiftTab => KeyOutcome::Commit(Move::Left),
            EditKey::Escape => KeyOutcome::Cancel,
            EditKey::Down => {
                self.list.highlight_next();
                KeyOutcome::Continue
            }
            EditKey::Up => {
                self.list.highlight_prev();
                KeyOutcome::Continue
            }
            EditKey::Char(c) => {
                self.list.push_query(c);
                KeyOutcome::QueryChanged
            }
            EditKey::Backspace => {
                self.list.pop_query();
                KeyOutcome::QueryChanged
            }
            _ => KeyOutcome::Continue,
        }
    }
}

/// Editing delegated to an external collaborator
#[derive(Debug, Clone)]
pub struct CustomSession {
    pub target: EditTarget,
    pub editor: String,
}

#[derive(Debug, Clone, Default)]
pub enum EditorState {
    #[default]
    Idle,
    Text(TextSession),
    List(ListSession),
    Custom(CustomSession),
}

impl EditorState {
    pub fn is_idle(&self) -> bool {
        matches!(self, EditorState::Idle)
    }

    pub fn kind(&self) -> Option<EditorKind> {
        match self {
            EditorState::Idle => None,
            EditorState::Text(_) => Some(EditorKind::Text),
            EditorState::List(_) => Some(EditorKind::List),
            EditorState::Custom(_) => Some(EditorKind::Custom),
        }
    }

    pub fn target(&self) -> Option<&EditTarget> {
        match self {
            EditorState::Idle => None,
            EditorState::Text(s) => Some(&s.target),
            EditorState::List(s) => Some(&s.target),
            EditorState::Custom(s) => Some(&s.target),
        }
    }

    pub fn list(&self) -> Option<&OptionList> {
        match self {
            EditorState::List(s) => Some(&s.list),
            _ => None,
        }
    }

    pub fn list_mut(&mut self) -> Option<&mut OptionList> {
        match self {
            EditorState::List(s) => Some(&mut s.list),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&TextBuffer> {
        match self {
            EditorState::Text(s) => Some(&s.buffer),
            _ => None,
        }
    }

    /// Leave the current state, returning it
    pub fn take(&mut self) -> EditorState {
        std::mem::take(self)
    }
}
