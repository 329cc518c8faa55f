//! Core domain types: the notebook handed over by the host, the resource
//! mapping threaded through the pipeline, and the stage records that
//! `%sql`/`%sqlvalidate` cells are rewritten into.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ArcExportError, Result};

/// Notebook format major version the exporter understands.
pub const SUPPORTED_NBFORMAT: u32 = 4;

// ---------------------------------------------------------------------------
// Notebook
// ---------------------------------------------------------------------------

/// An in-memory notebook: ordered cells plus a metadata mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Cells in document order.
    #[serde(default)]
    pub cells: Vec<Cell>,
    /// Notebook-level metadata (may carry a `language` field).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbformat: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbformat_minor: Option<u32>,
    /// Host-defined top-level fields, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notebook {
    /// Build a v4 notebook from a list of cells with empty metadata.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            metadata: Map::new(),
            nbformat: Some(SUPPORTED_NBFORMAT),
            nbformat_minor: Some(5),
            extra: Map::new(),
        }
    }

    /// Deserialize a notebook from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ArcExportError::parse(format!("invalid notebook JSON: {e}")))
    }

    /// The `language` field of the notebook metadata, if it is a string.
    pub fn language(&self) -> Option<&str> {
        self.metadata.get("language").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// The closed set of notebook cell kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

/// A single notebook cell.
///
/// Only `source` is ever rewritten by the exporter; `cell_type` and every
/// field in `extra` (outputs, metadata, execution count, id, ...) survive as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellType,
    /// Raw cell text. Accepts the list-of-lines encoding on input.
    #[serde(default, deserialize_with = "deserialize_source")]
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    /// Create a code cell with the given source.
    pub fn code(source: impl Into<String>) -> Self {
        Self {
            cell_type: CellType::Code,
            source: source.into(),
            extra: Map::new(),
        }
    }

    /// Create a markdown cell with the given source.
    pub fn markdown(source: impl Into<String>) -> Self {
        Self {
            cell_type: CellType::Markdown,
            source: source.into(),
            extra: Map::new(),
        }
    }

    /// Create a raw cell with the given source.
    pub fn raw(source: impl Into<String>) -> Self {
        Self {
            cell_type: CellType::Raw,
            source: source.into(),
            extra: Map::new(),
        }
    }

    /// Same cell with a different source; everything else is cloned.
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        Self {
            cell_type: self.cell_type,
            source: source.into(),
            extra: self.extra.clone(),
        }
    }
}

/// Notebook files store multi-line text either as one string or as a list
/// of lines that already carry their trailing newlines.
#[derive(Deserialize)]
#[serde(untagged)]
enum MultilineText {
    Single(String),
    Lines(Vec<String>),
}

fn deserialize_source<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match MultilineText::deserialize(deserializer)? {
        MultilineText::Single(s) => s,
        MultilineText::Lines(lines) => lines.concat(),
    })
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Host-owned key-value context threaded through every pipeline stage.
///
/// Stages may add or overwrite keys but never remove them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resources(BTreeMap<String, Value>);

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a resource mapping from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ArcExportError::parse(format!("invalid resources JSON: {e}")))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Convenience accessor for string-valued entries.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Stage records
// ---------------------------------------------------------------------------

/// The normalized job-definition stage a `%sql`/`%sqlvalidate` cell becomes.
///
/// Serialized with the `type` discriminator first, followed by the fields in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StageRecord {
    #[serde(rename = "SQLTransform")]
    SqlTransform(SqlTransformStage),
    #[serde(rename = "SQLValidate")]
    SqlValidate(SqlValidateStage),
}

/// Stage built from a `%sql` cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlTransformStage {
    pub name: String,
    pub description: String,
    pub environments: Vec<String>,
    pub sql: String,
    pub output_view: String,
    pub persist: bool,
    pub sql_params: BTreeMap<String, String>,
}

/// Stage built from a `%sqlvalidate` cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlValidateStage {
    pub name: String,
    pub description: String,
    pub environments: Vec<String>,
    pub sql: String,
    pub sql_params: BTreeMap<String, String>,
}

impl StageRecord {
    /// The `type` discriminator as written to JSON.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SqlTransform(_) => "SQLTransform",
            Self::SqlValidate(_) => "SQLValidate",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SqlTransform(s) => &s.name,
            Self::SqlValidate(s) => &s.name,
        }
    }

    /// Render as 2-space indented JSON, the text that replaces the cell source.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ArcExportError::parse(format!("failed to serialize stage: {e}")))
    }

    /// Parse a stage back from a rewritten cell source.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ArcExportError::parse(format!("invalid stage JSON: {e}")))
    }
}
