use thiserror::Error;

/// Errors raised by the programmatic surface of the grid.
///
/// These are caller bugs (bad index, duplicate key, unreadable config), never
/// data issues: bad cell data becomes a per-cell error marker instead.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("duplicate column key '{0}'")]
    DuplicateColumn(String),

    #[error("unknown data type '{0}'")]
    UnknownDataType(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("row {index} is out of bounds ({count} rows)")]
    RowOutOfBounds { index: usize, count: usize },

    #[error("column {index} is out of bounds ({count} columns)")]
    ColumnOutOfBounds { index: usize, count: usize },

    #[error("column '{0}' cannot be removed")]
    ColumnNotRemovable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridError>;
