use super::{MARKER_FIELD, Styling, is_list_of, item_object, required_list, required_str};
use crate::error::{Error, Result};
use crate::format::Record;
use crate::ir::{MARKER_KEY, Role, Sample, Turn};
use serde_json::Value;

const NAME: &str = "openai_chat";
const MESSAGES_KEY: &str = "messages";

/// Turn metadata key holding a message's optional `name`.
const NAME_KEY: &str = "name";

/// `{"messages": [{"role", "content", "name"?, "_marker"?}, ...]}`
///
/// Every role is written with its own name, so there is no fallback case.
/// `_marker` holds the turn's injection marker, so a later run can find
/// and replace an injected prompt. Other message keys are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiChatStyling;

impl Styling for OpenAiChatStyling {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, record: &Record) -> bool {
        is_list_of(record, MESSAGES_KEY, &["role", "content"])
    }

    fn to_ir(&self, record: &Record) -> Result<Sample> {
        let messages = required_list(NAME, record, MESSAGES_KEY)?;

        let turns = messages
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let message = item_object(NAME, MESSAGES_KEY, index, item)?;
                let role = required_str(NAME, message, "role")
                    .map_err(|e| at_message(index, &e))?;
                let content = required_str(NAME, message, "content")
                    .map_err(|e| at_message(index, &e))?;

                let mut turn = Turn::new(Role::parse(role), content);
                if let Some(Value::String(name)) = message.get(NAME_KEY) {
                    turn = turn.with_metadata(NAME_KEY, name.as_str());
                }
                if let Some(Value::String(marker)) = message.get(MARKER_FIELD) {
                    turn = turn.with_metadata(MARKER_KEY, marker.as_str());
                }
                Ok(turn)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Sample::new(turns))
    }

    fn from_ir(&self, sample: &Sample) -> Result<Record> {
        let messages = sample
            .turns
            .iter()
            .map(|turn| {
                let mut message = Record::new();
                message.insert("role".to_string(), Value::String(turn.role.to_string()));
                message.insert("content".to_string(), Value::String(turn.content.clone()));
                if let Some(name) = turn.meta(NAME_KEY) {
                    message.insert(NAME_KEY.to_string(), Value::String(name.to_string()));
                }
                if let Some(marker) = turn.meta(MARKER_KEY) {
                    message.insert(MARKER_FIELD.to_string(), Value::String(marker.to_string()));
                }
                Value::Object(message)
            })
            .collect();

        let mut record = Record::new();
        record.insert(MESSAGES_KEY.to_string(), Value::Array(messages));
        Ok(record)
    }
}

fn at_message(index: usize, err: &Error) -> Error {
    match err {
        Error::MalformedSample { styling, message } => {
            Error::malformed(styling.as_str(), format!("messages[{index}]: {message}"))
        }
        other => other.clone(),
    }
}
