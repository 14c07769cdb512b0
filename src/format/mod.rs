//! File formats: syntax only, no styling knowledge.
//!
//! Every format turns file content into an ordered list of raw [`Record`]s
//! and renders records back into file content.

mod delimited;
mod json;
mod jsonl;
mod yaml;

pub use delimited::CsvFormat;
pub use json::JsonFormat;
pub use jsonl::JsonlFormat;
pub use yaml::YamlFormat;

pub(crate) use delimited::sniff_delimiter;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A raw record: an ordered JSON object.
pub type Record = serde_json::Map<String, Value>;

/// Key used to wrap values that are not objects.
const WRAPPED_VALUE_KEY: &str = "value";

/// Key of the container list in `{"data": [...]}` documents.
const CONTAINER_KEY: &str = "data";

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Comma (or otherwise) separated values with a header row
    Csv,
    /// A JSON document
    Json,
    /// One JSON value per line
    Jsonl,
    /// A YAML stream
    Yaml,
}

impl FormatKind {
    /// Returns the registry name of this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Yaml => "yaml",
        }
    }

    /// Returns the file extension written for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        self.as_str()
    }

    /// Maps a file extension (without the dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "jsonl" => Some(Self::Jsonl),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Returns all formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Csv, Self::Json, Self::Jsonl, Self::Yaml]
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::config(format!("unknown format '{s}'")))
    }
}

/// Reads and writes raw records for one file format.
pub trait Format: Send + Sync {
    /// The format handled by this implementation.
    fn kind(&self) -> FormatKind;

    /// Parses file content into records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the content is not valid for this format.
    fn parse(&self, content: &str) -> Result<Vec<Record>>;

    /// Renders records into file content.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be serialized.
    fn render(&self, records: &[Record]) -> Result<String>;
}

/// Wraps a non-object value as `{"value": value}`.
fn wrap_value(value: Value) -> Record {
    let mut record = Record::new();
    record.insert(WRAPPED_VALUE_KEY.to_string(), value);
    record
}

fn push_item(value: Value, out: &mut Vec<Record>) {
    match value {
        Value::Object(map) => out.push(map),
        other => out.push(wrap_value(other)),
    }
}

/// Flattens one parsed JSON/YAML document into records.
///
/// Arrays yield one record per item, a `{"data": [...]}` container yields
/// its items, any other object is a single record, null is skipped and
/// scalars are wrapped.
fn unpack_document(document: Value, out: &mut Vec<Record>) {
    match document {
        Value::Null => {}
        Value::Array(items) => items.into_iter().for_each(|item| push_item(item, out)),
        Value::Object(mut map) => {
            if matches!(map.get(CONTAINER_KEY), Some(Value::Array(_))) {
                if let Some(Value::Array(items)) = map.remove(CONTAINER_KEY) {
                    items.into_iter().for_each(|item| push_item(item, out));
                }
            } else {
                out.push(map);
            }
        }
        scalar => out.push(wrap_value(scalar)),
    }
}
