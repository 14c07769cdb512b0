//! Stylings: the dialogue shape conventions a record can follow.
//!
//! Each styling converts its records into IR [`Sample`]s and back, and
//! declares the key signature used for auto-detection. Roles a styling has
//! no native field for go through the fallback table documented on each
//! implementation; a role without a fallback is a
//! [`MalformedSample`](crate::Error::MalformedSample) error.
//!
//! Injection markers survive a write only in `openai_chat`, whose messages
//! keep them under `_marker`. The other stylings have nowhere to put them.

mod alpaca;
mod chatml;
mod openai_chat;
mod sharegpt;
mod text_label;

pub use alpaca::AlpacaStyling;
pub use chatml::ChatmlStyling;
pub use openai_chat::OpenAiChatStyling;
pub use sharegpt::ShareGptStyling;
pub use text_label::TextLabelStyling;

use crate::error::{Error, Result};
use crate::format::Record;
use crate::ir::{Role, Sample, Turn};
use serde_json::Value;

/// Record key carrying a turn's injection marker in stylings whose entries
/// can hold extra keys.
pub(crate) const MARKER_FIELD: &str = "_marker";

/// Converts records of one styling to and from the IR.
///
/// Both conversions are pure: they never mutate their input and always
/// produce the same output for the same input.
pub trait Styling: Send + Sync {
    /// Registry name, e.g. `openai_chat`.
    fn name(&self) -> &str;

    /// Returns true if `record` has this styling's key signature.
    fn matches(&self, record: &Record) -> bool;

    /// Builds a sample from a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSample`] if required keys are missing or
    /// have the wrong shape.
    fn to_ir(&self, record: &Record) -> Result<Sample>;

    /// Builds a record from a sample.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSample`] if the sample holds a role this
    /// styling has no fallback for.
    fn from_ir(&self, sample: &Sample) -> Result<Record>;
}

/// The built-in stylings in detection priority order.
#[must_use]
pub fn builtin() -> Vec<Box<dyn Styling>> {
    vec![
        Box::new(OpenAiChatStyling),
        Box::new(ShareGptStyling),
        Box::new(AlpacaStyling),
        Box::new(ChatmlStyling::new()),
        Box::new(TextLabelStyling),
    ]
}

pub(crate) const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn required_str<'a>(styling: &str, record: &'a Record, key: &str) -> Result<&'a str> {
    match record.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(Error::malformed(
            styling,
            format!("'{key}' must be a string, got {}", json_type_name(other)),
        )),
        None => Err(Error::malformed(
            styling,
            format!("missing required key '{key}'"),
        )),
    }
}

/// A missing or null value counts as absent.
pub(crate) fn optional_str<'a>(
    styling: &str,
    record: &'a Record,
    key: &str,
) -> Result<Option<&'a str>> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_str(styling, record, key).map(Some),
    }
}

pub(crate) fn required_list<'a>(
    styling: &str,
    record: &'a Record,
    key: &str,
) -> Result<&'a [Value]> {
    match record.get(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::malformed(
            styling,
            format!("'{key}' must be a list, got {}", json_type_name(other)),
        )),
        None => Err(Error::malformed(
            styling,
            format!("missing required key '{key}'"),
        )),
    }
}

pub(crate) fn item_object<'a>(
    styling: &str,
    key: &str,
    index: usize,
    item: &'a Value,
) -> Result<&'a Record> {
    item.as_object().ok_or_else(|| {
        Error::malformed(
            styling,
            format!(
                "{key}[{index}] must be an object, got {}",
                json_type_name(item)
            ),
        )
    })
}

/// True if `record[key]` is a non-empty list of objects that all carry
/// every key in `fields`.
pub(crate) fn is_list_of(record: &Record, key: &str, fields: &[&str]) -> bool {
    record
        .get(key)
        .and_then(Value::as_array)
        .is_some_and(|items| {
            !items.is_empty()
                && items.iter().all(|item| {
                    item.as_object()
                        .is_some_and(|obj| fields.iter().all(|f| obj.contains_key(*f)))
                })
        })
}

pub(crate) fn unsupported_role(styling: &str, role: &Role) -> Error {
    Error::malformed(styling, format!("no fallback for role '{role}'"))
}

pub(crate) fn join_contents<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> String {
    turns
        .into_iter()
        .map(|turn| turn.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
