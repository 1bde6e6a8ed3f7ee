use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Grid-wide sizes, tolerances and timings.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub default_row_height: f64,
    pub default_col_width: f64,
    pub min_col_width: f64,
    pub max_col_width: f64,
    pub min_row_height: f64,
    pub max_row_height: f64,
    pub header_height: f64,
    pub row_header_width: f64,
    /// Distance from a header edge that still grabs it for resizing
    pub resize_tolerance: f64,
    pub fill_handle_size: f64,
    pub history_capacity: usize,
    pub transient_error_ms: u64,
    pub search_debounce_ms: u64,
    pub line_height: f64,
    pub cell_padding: f64,
    pub char_width: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_row_height: 30.0,
            default_col_width: 120.0,
            min_col_width: 40.0,
            max_col_width: 800.0,
            min_row_height: 20.0,
            max_row_height: 600.0,
            header_height: 32.0,
            row_header_width: 56.0,
            resize_tolerance: 4.0,
            fill_handle_size: 8.0,
            history_capacity: 100,
            transient_error_ms: 3000,
            search_debounce_ms: 250,
            line_height: 18.0,
            cell_padding: 12.0,
            char_width: 8.0,
        }
    }
}

impl GridConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GridConfig = toml::from_str(content)
            .map_err(|e| GridError::Config(format!("Failed to parse config: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn check(&self) -> Result<()> {
        if self.min_col_width > self.max_col_width {
            return Err(GridError::Config("min_col_width exceeds max_col_width".to_string()));
        }
        if self.min_row_height > self.max_row_height {
            return Err(GridError::Config("min_row_height exceeds max_row_height".to_string()));
        }
        if self.default_row_height <= 0.0 || self.default_col_width <= 0.0 {
            return Err(GridError::Config("default sizes must be positive".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(GridError::Config("history_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn transient_error_ttl(&self) -> Duration {
        Duration::from_millis(self.transient_error_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
