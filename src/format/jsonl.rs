use super::{Format, FormatKind, Record, push_item};
use crate::error::{Error, Result};
use serde_json::Value;

/// Newline-delimited JSON. Blank lines are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlFormat;

impl Format for JsonlFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Jsonl
    }

    fn parse(&self, content: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(line)
                .map_err(|e| Error::parse("jsonl", format!("line {}: {e}", line_num + 1)))?;
            push_item(value, &mut records);
        }

        Ok(records)
    }

    fn render(&self, records: &[Record]) -> Result<String> {
        let mut out = String::new();
        for record in records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_skips_blank_lines() {
        let content = "{\"text\": \"a\"}\n\n{\"text\": \"b\"}\n";
        let records = JsonlFormat.parse(content).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let content = "{\"text\": \"a\"}\n{oops}\n";
        let err = JsonlFormat.parse(content).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_render_one_object_per_line() {
        let records = JsonlFormat.parse("{\"a\": 1}\n{\"b\": [1, 2]}").unwrap();
        let out = JsonlFormat.render(&records).unwrap();
        assert_eq!(out, "{\"a\":1}\n{\"b\":[1,2]}\n");
        assert_eq!(records[1]["b"], json!([1, 2]));
    }
}
