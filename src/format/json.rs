use super::{Format, FormatKind, Record, unpack_document};
use crate::error::{Error, Result};
use serde_json::Value;

/// Whole-document JSON: an array, a `{"data": [...]}` container or one object.
///
/// Output is always a pretty-printed array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Json
    }

    fn parse(&self, content: &str) -> Result<Vec<Record>> {
        let document: Value =
            serde_json::from_str(content).map_err(|e| Error::parse("json", e.to_string()))?;

        let mut records = Vec::new();
        unpack_document(document, &mut records);
        Ok(records)
    }

    fn render(&self, records: &[Record]) -> Result<String> {
        let mut out = serde_json::to_string_pretty(records)?;
        out.push('\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array() {
        let records = JsonFormat.parse(r#"[{"text": "a"}, {"text": "b"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["text"], json!("b"));
    }

    #[test]
    fn test_parse_single_object() {
        let records = JsonFormat.parse(r#"{"instruction": "x", "output": "y"}"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_wraps_scalars() {
        let records = JsonFormat.parse("[1, \"two\"]").unwrap();
        assert_eq!(records[0]["value"], json!(1));
        assert_eq!(records[1]["value"], json!("two"));
    }

    #[test]
    fn test_parse_invalid() {
        let err = JsonFormat.parse("[{").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_render_keeps_key_order() {
        let records = JsonFormat.parse(r#"[{"zeta": 1, "alpha": 2}]"#).unwrap();
        let out = JsonFormat.render(&records).unwrap();
        assert!(out.find("zeta").unwrap() < out.find("alpha").unwrap());
        assert!(out.ends_with("]\n"));
    }
}
