//! Per-column conversion and validation of incoming cell values.
//!
//! Every path that writes a value into the grid (typing, list picks, paste,
//! drag-fill, programmatic batches) funnels through [`coerce`], so a value is
//! always re-validated against the column it lands in.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::schema::{ColumnDef, DataType, SelectOption};
use crate::value::{format_number, CellValue};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("a value is required")]
    Required,
    #[error("value cannot be empty")]
    NotNullable,
    #[error("expected a {expected} value, got '{got}'")]
    TypeMismatch { expected: DataType, got: String },
    #[error("value is longer than {max} characters")]
    TooLong { max: usize },
    #[error("decimals are not allowed")]
    DecimalNotAllowed,
    #[error("'{0}' is not one of the options")]
    InvalidOption(String),
    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),
    #[error("'{0}' is not a valid date")]
    InvalidDate(String),
    #[error("column has no text conversion")]
    NoTextConversion,
}

impl ValidationError {
    /// Required-field errors stay on the cell until fixed; the rest expire.
    pub fn is_persistent(&self) -> bool {
        matches!(self, ValidationError::Required)
    }
}

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("static e-mail pattern")
    })
}

/// Parse a numeric string. Thousands separators and a leading '+' are accepted.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|&c| c != ',' && c != '_').collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Common spellings of true/false
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" | "checked" | "x" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "off" | "unchecked" => Some(false),
        _ => None,
    }
}

/// Parse a date in one of the accepted layouts, or a full timestamp
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.date())
}

fn mismatch(column: &ColumnDef, value: &CellValue) -> ValidationError {
    ValidationError::TypeMismatch { expected: column.data_type, got: value.to_string() }
}

fn lookup_option(raw: &str, options: &[SelectOption]) -> Option<String> {
    let raw = raw.trim();
    options
        .iter()
        .filter(|o| !o.is_blank())
        .find(|o| o.id == raw)
        .or_else(|| {
            options
                .iter()
                .filter(|o| !o.is_blank())
                .find(|o| o.label.eq_ignore_ascii_case(raw))
        })
        .map(|o| o.id.clone())
}

/// Convert `value` into the column's data type, then validate it.
///
/// `options` are the select options known for the column: the static list,
/// or whatever an async resolver last produced for it.
pub fn coerce(
    column: &ColumnDef,
    value: &CellValue,
    options: &[SelectOption],
) -> Result<CellValue, ValidationError> {
    if value.is_blank() {
        return validate(column, CellValue::Null);
    }

    let converted = match column.data_type {
        DataType::Text => match value {
            CellValue::Text(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        },
        DataType::Number => match value {
            CellValue::Number(n) => CellValue::Number(*n),
            CellValue::Text(s) => {
                CellValue::Number(parse_number(s).ok_or_else(|| mismatch(column, value))?)
            }
            _ => return Err(mismatch(column, value)),
        },
        DataType::Boolean => match value {
            CellValue::Bool(b) => CellValue::Bool(*b),
            CellValue::Text(s) => CellValue::Bool(parse_bool(s).ok_or_else(|| mismatch(column, value))?),
            CellValue::Number(n) if *n == 0.0 || *n == 1.0 => CellValue::Bool(*n == 1.0),
            _ => return Err(mismatch(column, value)),
        },
        DataType::Date => match value {
            CellValue::Date(d) => CellValue::Date(*d),
            CellValue::Text(s) => {
                CellValue::Date(parse_date(s).ok_or_else(|| ValidationError::InvalidDate(s.clone()))?)
            }
            _ => return Err(mismatch(column, value)),
        },
        DataType::Select => {
            if options.is_empty() && column.static_options().is_none() {
                // async column with nothing resolved yet: no safe way to map text to an id
                return Err(ValidationError::NoTextConversion);
            }
            let raw = match value {
                CellValue::Number(n) => format_number(*n),
                CellValue::Date(_) => return Err(mismatch(column, value)),
                other => other.to_string(),
            };
            CellValue::Text(
                lookup_option(&raw, options).ok_or(ValidationError::InvalidOption(raw))?,
            )
        }
        DataType::Email => match value {
            CellValue::Text(s) => {
                let s = s.trim();
                if !email_regex().is_match(s) {
                    return Err(ValidationError::InvalidEmail(s.to_string()));
                }
                CellValue::Text(s.to_string())
            }
            _ => return Err(mismatch(column, value)),
        },
    };

    validate(column, converted)
}

/// Check an already-typed value against the column's constraints
pub fn validate(column: &ColumnDef, value: CellValue) -> Result<CellValue, ValidationError> {
    match &value {
        CellValue::Null => {
            if column.required {
                return Err(ValidationError::Required);
            }
            if !column.nullable {
                return Err(ValidationError::NotNullable);
            }
        }
        CellValue::Text(s) => {
            if let Some(max) = column.max_length {
                if s.chars().count() > max {
                    return Err(ValidationError::TooLong { max });
                }
            }
        }
        CellValue::Number(n) => {
            if !n.is_finite() {
                return Err(mismatch(column, &value));
            }
            if !column.decimal_allowed && n.fract() != 0.0 {
                return Err(ValidationError::DecimalNotAllowed);
            }
        }
        CellValue::Bool(_) | CellValue::Date(_) => {}
    }
    Ok(value)
}

/// Whether a value already has the shape of the column's data type
pub fn matches_type(data_type: DataType, value: &CellValue) -> bool {
    match (data_type, value) {
        (_, CellValue::Null) => true,
        (DataType::Number, CellValue::Number(_)) => true,
        (DataType::Boolean, CellValue::Bool(_)) => true,
        (DataType::Date, CellValue::Date(_)) => true,
        (DataType::Text | DataType::Email | DataType::Select, CellValue::Text(_)) => true,
        _ => false,
    }
}
