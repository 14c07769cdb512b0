use super::{Styling, required_str, unsupported_role};
use crate::error::{Error, Result};
use crate::format::Record;
use crate::ir::Sample;
use crate::template::{ChatTemplateSpec, ReverseParser};
use serde_json::Value;

const NAME: &str = "chatml";
const TEXT_KEY: &str = "text";
const BLOCK_START: &str = "<|im_start|>";

/// `{"text": "<|im_start|>role\ncontent<|im_end|>\n..."}`
///
/// Only `system`, `user`, `assistant` and `function` blocks are recognised,
/// so any other role has no fallback. Content is kept byte for byte.
/// Turn metadata, injection markers included, is not written.
#[derive(Debug, Clone)]
pub struct ChatmlStyling {
    parser: ReverseParser,
}

impl ChatmlStyling {
    /// Creates the styling around the built-in ChatML template.
    #[must_use]
    pub fn new() -> Self {
        let spec = ChatTemplateSpec::chatml().with_whitespace_normalization(false);
        Self {
            parser: ReverseParser::new(spec).allow_empty_content(true),
        }
    }
}

impl Default for ChatmlStyling {
    fn default() -> Self {
        Self::new()
    }
}

impl Styling for ChatmlStyling {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, record: &Record) -> bool {
        record
            .get(TEXT_KEY)
            .and_then(Value::as_str)
            .is_some_and(|text| text.contains(BLOCK_START))
    }

    fn to_ir(&self, record: &Record) -> Result<Sample> {
        let text = required_str(NAME, record, TEXT_KEY)?;
        let turns = self
            .parser
            .parse(text)
            .map_err(|e| Error::malformed(NAME, e.to_string()))?;
        Ok(Sample::new(turns))
    }

    fn from_ir(&self, sample: &Sample) -> Result<Record> {
        let spec = self.parser.spec();

        let blocks = sample
            .turns
            .iter()
            .map(|turn| {
                let delimiter = spec
                    .delimiter_for(&turn.role)
                    .ok_or_else(|| unsupported_role(NAME, &turn.role))?;
                Ok(format!(
                    "{}{}{}",
                    delimiter.start,
                    turn.content,
                    delimiter.end.as_deref().unwrap_or_default()
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut record = Record::new();
        record.insert(TEXT_KEY.to_string(), Value::String(blocks.join("\n")));
        Ok(record)
    }
}
