use super::{Format, FormatKind, Record};
use crate::error::{Error, Result};
use serde_json::Value;

/// Delimiters tried when sniffing, in priority order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Number of data rows checked for a consistent field count.
const SNIFF_ROWS: usize = 5;

/// Delimited text with a header row.
///
/// The delimiter is sniffed from the content (`,` when nothing qualifies).
/// Cells holding a JSON array or object are decoded back into JSON, which
/// lets nested styling fields such as `messages` survive a CSV round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

impl Format for CsvFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Csv
    }

    fn parse(&self, content: &str) -> Result<Vec<Record>> {
        let delimiter = sniff_delimiter(content).unwrap_or(b',');
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| Error::parse("csv", e.to_string()))?
            .clone();

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| Error::parse("csv", format!("row {}: {e}", index + 1)))?;
            let record = headers
                .iter()
                .zip(row.iter())
                .map(|(key, cell)| (key.to_string(), decode_cell(cell)))
                .collect();
            records.push(record);
        }

        Ok(records)
    }

    fn render(&self, records: &[Record]) -> Result<String> {
        if records.is_empty() {
            return Ok(String::new());
        }

        // Union of keys in first-seen order
        let mut columns: Vec<&str> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }

        let mut writer = ::csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&columns)?;

        for record in records {
            let row = columns
                .iter()
                .map(|column| record.get(*column).map_or_else(String::new, encode_cell))
                .collect::<Vec<_>>();
            writer.write_record(&row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Serialization {
                message: e.to_string(),
            })?;
        String::from_utf8(bytes).map_err(|e| Error::Serialization {
            message: e.to_string(),
        })
    }
}

/// Finds a delimiter that yields a header of at least two fields and
/// consistent field counts over the first rows.
pub(crate) fn sniff_delimiter(content: &str) -> Option<u8> {
    let header = content.lines().find(|line| !line.trim().is_empty())?;

    CANDIDATE_DELIMITERS.into_iter().find(|&delimiter| {
        if !header.as_bytes().contains(&delimiter) {
            return false;
        }

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let columns = match reader.headers() {
            Ok(headers) => headers.len(),
            Err(_) => return false,
        };

        columns >= 2
            && reader
                .records()
                .take(SNIFF_ROWS)
                .all(|row| row.is_ok_and(|row| row.len() == columns))
    })
}

fn decode_cell(cell: &str) -> Value {
    let trimmed = cell.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(cell) {
            return value;
        }
    }
    Value::String(cell.to_string())
}

fn encode_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
        }
    }
}
