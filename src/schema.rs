use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::editor::OptionResolver;
use crate::error::{GridError, Result};
use crate::value::CellValue;

/// User values of a row, keyed by column key
pub type RowValues = HashMap<String, CellValue>;

/// Decides from the row's values whether a cell is disabled
pub type DisabledPredicate = Arc<dyn Fn(&RowValues) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Number,
    Boolean,
    Date,
    Select,
    Email,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Select => "select",
            DataType::Email => "email",
        }
    }

    /// Columns whose text may wrap over several lines
    pub fn can_wrap(&self) -> bool {
        matches!(self, DataType::Text | DataType::Email)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "string" => Ok(DataType::Text),
            "number" | "numeric" => Ok(DataType::Number),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            "select" => Ok(DataType::Select),
            "email" => Ok(DataType::Email),
            _ => Err(GridError::UnknownDataType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into() }
    }

    /// The synthetic "no value" entry shown first for nullable columns
    pub fn blank() -> Self {
        Self { id: String::new(), label: String::new() }
    }

    pub fn is_blank(&self) -> bool {
        self.id.is_empty()
    }
}

/// Where a select column gets its options from
#[derive(Clone)]
pub enum OptionSource {
    Static(Vec<SelectOption>),
    Resolver(Arc<dyn OptionResolver>),
}

impl fmt::Debug for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionSource::Static(opts) => f.debug_tuple("Static").field(opts).finish(),
            OptionSource::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Descriptor of a single column
#[derive(Clone)]
pub struct ColumnDef {
    pub key: String,
    pub title: String,
    pub data_type: DataType,
    pub required: bool,
    pub nullable: bool,
    pub max_length: Option<usize>,
    pub decimal_allowed: bool,
    pub options: Option<OptionSource>,
    pub disabled: Option<DisabledPredicate>,
    pub default_value: CellValue,
    pub readonly: bool,
    pub removable: bool,
    pub wrap: bool,
    /// Name of an externally supplied editor, if the column uses one
    pub editor: Option<String>,
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("data_type", &self.data_type)
            .field("required", &self.required)
            .field("nullable", &self.nullable)
            .field("readonly", &self.readonly)
            .field("options", &self.options)
            .field("disabled", &self.disabled.is_some())
            .field("editor", &self.editor)
            .finish()
    }
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, data_type: DataType) -> Self {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            data_type,
            required: false,
            nullable: true,
            max_length: None,
            decimal_allowed: true,
            options: None,
            disabled: None,
            default_value: CellValue::Null,
            readonly: false,
            removable: true,
            wrap: false,
            editor: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_decimals(mut self, allowed: bool) -> Self {
        self.decimal_allowed = allowed;
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(OptionSource::Static(options));
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn OptionResolver>) -> Self {
        self.options = Some(OptionSource::Resolver(resolver));
        self
    }

    pub fn disabled_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RowValues) -> bool + Send + Sync + 'static,
    {
        self.disabled = Some(Arc::new(predicate));
        self
    }

    pub fn with_default(mut self, value: impl Into<CellValue>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn with_removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }

    pub fn wrapping(mut self) -> Self {
        self.wrap = true;
        self
    }

    pub fn with_custom_editor(mut self, name: impl Into<String>) -> Self {
        self.editor = Some(name.into());
        self
    }

    pub fn static_options(&self) -> Option<&[SelectOption]> {
        match &self.options {
            Some(OptionSource::Static(opts)) => Some(opts),
            _ => None,
        }
    }

    pub fn resolver(&self) -> Option<&Arc<dyn OptionResolver>> {
        match &self.options {
            Some(OptionSource::Resolver(r)) => Some(r),
            _ => None,
        }
    }

    pub fn is_disabled_for(&self, values: &RowValues) -> bool {
        self.disabled.as_ref().map(|p| p(values)).unwrap_or(false)
    }

    pub fn wraps(&self) -> bool {
        self.wrap && self.data_type.can_wrap()
    }
}

/// Serializable column description, used for schema files.
/// The data type is kept as a string so unknown names fail with a typed error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default = "default_true")]
    pub decimal_allowed: bool,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default = "default_true")]
    pub removable: bool,
    #[serde(default)]
    pub wrap: bool,
}

fn default_true() -> bool {
    true
}

impl TryFrom<ColumnSpec> for ColumnDef {
    type Error = GridError;

    fn try_from(spec: ColumnSpec) -> Result<Self> {
        let data_type: DataType = spec.data_type.parse()?;
        let mut def = ColumnDef::new(spec.key, data_type)
            .with_nullable(spec.nullable)
            .with_decimals(spec.decimal_allowed)
            .with_removable(spec.removable);
        if let Some(title) = spec.title {
            def.title = title;
        }
        def.required = spec.required;
        def.max_length = spec.max_length;
        def.readonly = spec.readonly;
        def.wrap = spec.wrap;
        if !spec.options.is_empty() {
            def.options = Some(OptionSource::Static(spec.options));
        }
        if let Some(default) = spec.default {
            def.default_value = CellValue::from_json(&default);
        }
        Ok(def)
    }
}

/// Ordered set of uniquely keyed columns
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<ColumnDef>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        let mut schema = Self::default();
        for col in columns {
            let at = schema.len();
            schema.insert(at, col)?;
        }
        Ok(schema)
    }

    pub fn from_specs(specs: Vec<ColumnSpec>) -> Result<Self> {
        let columns = specs
            .into_iter()
            .map(ColumnDef::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnDef> {
        self.columns.get(idx)
    }

    pub fn column_by_key(&self, key: &str) -> Option<&ColumnDef> {
        self.position(key).and_then(|i| self.columns.get(i))
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    /// Insert a column at `at` (clamped to the end). Fails on duplicate keys.
    pub fn insert(&mut self, at: usize, column: ColumnDef) -> Result<()> {
        if self.index.contains_key(&column.key) {
            return Err(GridError::DuplicateColumn(column.key));
        }
        let at = at.min(self.columns.len());
        self.columns.insert(at, column);
        self.rebuild_index();
        Ok(())
    }

    pub fn remove(&mut self, at: usize) -> Option<ColumnDef> {
        if at >= self.columns.len() {
            return None;
        }
        let removed = self.columns.remove(at);
        self.rebuild_index();
        Some(removed)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.key.clone(), i))
            .collect();
    }
}
