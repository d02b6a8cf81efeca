/*!
 * Notebook document model.
 *
 * A notebook is kept as its parsed JSON object so every field the translator
 * does not interpret (notebook metadata, format version, cell ids, outputs,
 * execution counts, attachments, unknown keys) survives a load/write cycle with
 * its original key order and value. Only the cell list and each cell's `source`
 * are ever replaced.
 */

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Kind of a notebook cell as declared by its `cell_type` tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Narrative markdown cell
    Markdown,
    /// Executable code cell
    Code,
    /// Anything else (raw cells, future kinds); passed through untouched
    Other(String),
}

impl CellKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "markdown" => Self::Markdown,
            "code" => Self::Code,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => f.write_str("markdown"),
            Self::Code => f.write_str("code"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// A single notebook cell.
///
/// Cells are immutable once loaded; processing produces a new cell through
/// [`Cell::with_source`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    kind: CellKind,
    source: String,
    fields: Map<String, Value>,
}

impl Cell {
    /// Build a cell from its JSON object, validating `cell_type` and `source`
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, String> {
        let kind = match fields.get("cell_type") {
            Some(Value::String(tag)) => CellKind::from_tag(tag),
            Some(_) => return Err("cell_type is not a string".to_string()),
            None => return Err("cell is missing cell_type".to_string()),
        };

        let source = match fields.get("source") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(lines)) => {
                let mut text = String::new();
                for line in lines {
                    match line {
                        Value::String(s) => text.push_str(s),
                        _ => return Err("source lines must be strings".to_string()),
                    }
                }
                text
            }
            Some(_) => return Err("source must be a string or a list of strings".to_string()),
            None => return Err("cell is missing source".to_string()),
        };

        Ok(Self { kind, source, fields })
    }

    /// Convenience constructor for a cell with empty metadata
    pub fn new(kind: CellKind, source: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("cell_type".to_string(), Value::String(kind.to_string()));
        fields.insert("metadata".to_string(), Value::Object(Map::new()));
        fields.insert("source".to_string(), Value::Array(source_lines(source)));
        if kind == CellKind::Code {
            fields.insert("execution_count".to_string(), Value::Null);
            fields.insert("outputs".to_string(), Value::Array(Vec::new()));
        }
        Self {
            kind,
            source: source.to_string(),
            fields,
        }
    }

    /// Declared cell kind
    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    /// Full source text with line endings intact
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Cell metadata, never interpreted
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.fields.get("metadata").and_then(Value::as_object)
    }

    /// Cell id (nbformat 4.5+)
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    /// Base64 payload and mime type of a named attachment.
    ///
    /// When an attachment carries several representations the first image
    /// type wins.
    pub fn attachment(&self, name: &str) -> Option<(&str, &str)> {
        let bundle = self.fields.get("attachments")?.as_object()?.get(name)?.as_object()?;
        bundle
            .iter()
            .filter_map(|(mime, data)| Some((mime.as_str(), data_as_str(data)?)))
            .find(|(mime, _)| mime.starts_with("image/"))
            .map(|(mime, data)| (data, mime))
    }

    /// A copy of this cell with its source replaced.
    ///
    /// The source keeps the representation it was loaded with (single string
    /// or list of lines); every other field is carried over unchanged.
    pub fn with_source(&self, source: &str) -> Self {
        let mut fields = self.fields.clone();
        let value = match self.fields.get("source") {
            Some(Value::String(_)) => Value::String(source.to_string()),
            _ => Value::Array(source_lines(source)),
        };
        fields.insert("source".to_string(), value);
        Self {
            kind: self.kind.clone(),
            source: source.to_string(),
            fields,
        }
    }

    /// JSON object for this cell
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

// Multi-line attachment payloads are stored as a list of strings in some writers;
// only the single-string form is accepted here.
fn data_as_str(value: &Value) -> Option<&str> {
    value.as_str()
}

/// Split text into nbformat's list-of-lines form, each line keeping its `\n`
pub fn source_lines(text: &str) -> Vec<Value> {
    text.split_inclusive('\n')
        .map(|line| Value::String(line.to_string()))
        .collect()
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        Cell::from_fields(fields).map_err(D::Error::custom)
    }
}

/// A complete notebook document.
///
/// `fields` holds every top-level key in its original order; the `cells` entry is
/// a placeholder that is substituted with [`Notebook::cells`] on serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    cells: Vec<Cell>,
    fields: Map<String, Value>,
}

impl Notebook {
    /// Oldest major format version accepted
    pub const MIN_FORMAT: u64 = 4;

    /// Build a notebook from its top-level JSON value
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut fields) = value else {
            return Err("notebook root is not a JSON object".to_string());
        };

        let raw_cells = match fields.get_mut("cells") {
            Some(Value::Array(cells)) => std::mem::take(cells),
            Some(_) => return Err("'cells' is not a list".to_string()),
            None => return Err("notebook has no 'cells' list".to_string()),
        };

        match fields.get("nbformat").and_then(Value::as_u64) {
            Some(major) if major >= Self::MIN_FORMAT => {}
            Some(major) => {
                return Err(format!(
                    "nbformat {} is not supported (need {} or later)",
                    major,
                    Self::MIN_FORMAT
                ));
            }
            None => return Err("notebook has no integer 'nbformat'".to_string()),
        }

        let mut cells = Vec::with_capacity(raw_cells.len());
        for (index, raw) in raw_cells.into_iter().enumerate() {
            let Value::Object(cell_fields) = raw else {
                return Err(format!("cell {} is not a JSON object", index));
            };
            let cell = Cell::from_fields(cell_fields).map_err(|e| format!("cell {}: {}", index, e))?;
            cells.push(cell);
        }

        Ok(Self { cells, fields })
    }

    /// Top-level JSON value with the current cells in place
    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        let cells = Value::Array(
            self.cells
                .iter()
                .map(|c| Value::Object(c.fields().clone()))
                .collect(),
        );
        fields.insert("cells".to_string(), cells);
        Value::Object(fields)
    }

    /// Ordered cell sequence
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Declared format version as (major, minor)
    pub fn format_version(&self) -> (u64, u64) {
        let major = self.fields.get("nbformat").and_then(Value::as_u64).unwrap_or(0);
        let minor = self.fields.get("nbformat_minor").and_then(Value::as_u64).unwrap_or(0);
        (major, minor)
    }

    /// Notebook-level metadata
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.fields.get("metadata").and_then(Value::as_object)
    }

    /// Programming language of the code cells, from `language_info` or the kernelspec
    pub fn language_name(&self) -> Option<&str> {
        let metadata = self.metadata()?;
        metadata
            .get("language_info")
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .or_else(|| {
                metadata
                    .get("kernelspec")
                    .and_then(|spec| spec.get("language"))
                    .and_then(Value::as_str)
            })
    }

    /// A new notebook with the same non-cell fields and the given cells
    pub fn with_cells(&self, cells: Vec<Cell>) -> Self {
        Self {
            cells,
            fields: self.fields.clone(),
        }
    }
}

impl Serialize for Notebook {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Notebook {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Notebook::from_value(value).map_err(D::Error::custom)
    }
}
