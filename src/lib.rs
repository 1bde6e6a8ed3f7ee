//! Headless core of a virtualized, schema-driven data grid.
//!
//! The [`Grid`] owns the rows, their layout and all interaction state. A
//! host feeds it pointer, keyboard and clipboard input, paints the cells in
//! [`Grid::visible_range`], and listens to [`GridEvent`]s.

pub mod clipboard;
pub mod coerce;
pub mod config;
pub mod dimension;
pub mod editor;
pub mod error;
pub mod event;
pub mod fileio;
pub mod grid;
pub mod history;
pub mod schema;
pub mod selection;
pub mod table;
pub mod value;

pub use clipboard::CopyBuffer;
pub use coerce::ValidationError;
pub use config::GridConfig;
pub use dimension::{HitTarget, IndexSpan, Rect, TextMeasure, VisibleRange};
pub use editor::{EditKey, EditorKind, OptionReply, OptionRequest, OptionResolver};
pub use error::{GridError, Result};
pub use event::{ContextTarget, GridEvent};
pub use grid::{CellUpdate, Direction, ExportOptions, Grid, Modifiers, UpdateReport};
pub use schema::{ColumnDef, ColumnSpec, DataType, Schema, SelectOption};
pub use selection::{CellPos, CellRange, Selection};
pub use value::CellValue;
