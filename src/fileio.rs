//! Loading datasets and schemas from disk for the inspection binary.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::info;

use crate::error::{GridError, Result};
use crate::schema::{ColumnDef, ColumnSpec, DataType, Schema};

/// Largest dataset accepted, rows by columns
const MAX_DIM: (usize, usize) = (10_000_000, 10_000);

/// Detected file format
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Csv,
    Tsv,
}

impl FileFormat {
    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" => Some(FileFormat::Tsv),
            _ => None,
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            FileFormat::Csv => b',',
            FileFormat::Tsv => b'\t',
        }
    }
}

/// Records read from a delimited file, plus anything worth telling the user
pub struct LoadResult {
    pub headers: Vec<String>,
    pub records: Vec<Map<String, JsonValue>>,
    pub warnings: Vec<String>,
}

pub struct FileIO {
    pub file_path: PathBuf,
    delimiter: u8,
}

impl FileIO {
    /// `delimiter` overrides the one implied by the file extension
    pub fn new(file_path: PathBuf, delimiter: Option<u8>) -> Self {
        let delimiter = delimiter
            .or_else(|| FileFormat::from_extension(&file_path).map(|f| f.delimiter()))
            .unwrap_or(b',');
        Self { file_path, delimiter }
    }

    pub fn delimiter_name(&self) -> String {
        match self.delimiter {
            b',' => "comma".to_string(),
            b'\t' => "tab".to_string(),
            b';' => "semicolon".to_string(),
            b'|' => "pipe".to_string(),
            d => format!("'{}'", d as char),
        }
    }

    /// Read the file as header-keyed records. Every cell arrives as text; the
    /// grid's coercion decides what it means.
    pub fn load_records(&self) -> Result<LoadResult> {
        let file = File::open(&self.file_path)?;
        let reader = BufReader::with_capacity(1 << 20, file); // 1 MB

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Fields)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.len() > MAX_DIM.1 {
            return Err(io::Error::from(io::ErrorKind::FileTooLarge).into());
        }

        let mut records = Vec::new();
        let mut ragged = 0usize;
        for result in csv_reader.records() {
            let record = result.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if records.len() >= MAX_DIM.0 {
                return Err(io::Error::from(io::ErrorKind::FileTooLarge).into());
            }
            if record.len() != headers.len() {
                ragged += 1;
            }
            let map: Map<String, JsonValue> = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, cell)| !cell.is_empty())
                .map(|(key, cell)| (key.clone(), JsonValue::String(cell.to_string())))
                .collect();
            records.push(map);
        }

        let mut warnings = Vec::new();
        if ragged > 0 {
            warnings.push(format!("{} rows did not match the header width ({} columns)", ragged, headers.len()));
        }
        info!("loaded {} records from {}", records.len(), self.file_path.display());

        Ok(LoadResult { headers, records, warnings })
    }
}

/// A schema file: `[[columns]]` tables in TOML
#[derive(Debug, Deserialize)]
struct SchemaFile {
    columns: Vec<ColumnSpec>,
}

pub fn schema_from_toml_str(content: &str) -> Result<Schema> {
    let file: SchemaFile =
        toml::from_str(content).map_err(|e| GridError::Config(format!("Failed to parse schema: {}", e)))?;
    Schema::from_specs(file.columns)
}

pub fn load_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    schema_from_toml_str(&content)
}

/// All-text schema named after the header row
pub fn infer_schema(headers: &[String]) -> Result<Schema> {
    Schema::new(headers.iter().map(|h| ColumnDef::new(h.as_str(), DataType::Text)).collect())
}
