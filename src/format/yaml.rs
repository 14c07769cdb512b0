use super::{Format, FormatKind, Record, unpack_document};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// YAML streams, including multi-document files separated by `---`.
///
/// Output is a single document holding a sequence of mappings.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl Format for YamlFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Yaml
    }

    fn parse(&self, content: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        for document in serde_yaml::Deserializer::from_str(content) {
            let value =
                Value::deserialize(document).map_err(|e| Error::parse("yaml", e.to_string()))?;
            unpack_document(value, &mut records);
        }

        Ok(records)
    }

    fn render(&self, records: &[Record]) -> Result<String> {
        Ok(serde_yaml::to_string(records)?)
    }
}
