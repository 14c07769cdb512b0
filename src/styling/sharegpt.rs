use super::{MARKER_FIELD, Styling, is_list_of, item_object, required_list, required_str};
use crate::error::{Error, Result};
use crate::format::Record;
use crate::ir::{MARKER_KEY, Role, Sample, Turn};
use serde_json::Value;

const NAME: &str = "sharegpt";
const CONVERSATIONS_KEY: &str = "conversations";

/// Turn metadata key holding a non-canonical `from` tag.
const SOURCE_TAG_KEY: &str = "sharegpt_from";

/// `{"conversations": [{"from", "value"}, ...]}`
///
/// | role | `from` |
/// |---|---|
/// | system | `system` |
/// | user | `human` |
/// | assistant | `gpt` |
/// | function | `function` |
/// | other | its name verbatim |
///
/// Aliases such as `user` or `chatgpt` are accepted on input and written
/// back unchanged. A `_marker` key on an entry is read as the turn's
/// injection marker; markers are not written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareGptStyling;

fn role_for_tag(tag: &str) -> Role {
    match tag {
        "human" | "user" => Role::User,
        "gpt" | "assistant" | "chatgpt" | "bing" => Role::Assistant,
        "system" => Role::System,
        "function" | "function_call" | "observation" | "tool" => Role::Function,
        other => Role::Other(other.to_string()),
    }
}

fn canonical_tag(role: &Role) -> &str {
    match role {
        Role::System => "system",
        Role::User => "human",
        Role::Assistant => "gpt",
        Role::Function => "function",
        Role::Other(name) => name,
    }
}

impl Styling for ShareGptStyling {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, record: &Record) -> bool {
        is_list_of(record, CONVERSATIONS_KEY, &["from", "value"])
    }

    fn to_ir(&self, record: &Record) -> Result<Sample> {
        let conversations = required_list(NAME, record, CONVERSATIONS_KEY)?;

        let turns = conversations
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let entry = item_object(NAME, CONVERSATIONS_KEY, index, item)?;
                let locate = |e: Error| match e {
                    Error::MalformedSample { message, .. } => {
                        Error::malformed(NAME, format!("conversations[{index}]: {message}"))
                    }
                    other => other,
                };
                let tag = required_str(NAME, entry, "from").map_err(locate)?;
                let value = required_str(NAME, entry, "value").map_err(locate)?;

                let role = role_for_tag(tag);
                let mut turn = if canonical_tag(&role) == tag {
                    Turn::new(role, value)
                } else {
                    Turn::new(role, value).with_metadata(SOURCE_TAG_KEY, tag)
                };
                if let Some(Value::String(marker)) = entry.get(MARKER_FIELD) {
                    turn = turn.with_metadata(MARKER_KEY, marker.as_str());
                }
                Ok(turn)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Sample::new(turns))
    }

    fn from_ir(&self, sample: &Sample) -> Result<Record> {
        let conversations = sample
            .turns
            .iter()
            .map(|turn| {
                let tag = turn
                    .meta(SOURCE_TAG_KEY)
                    .filter(|tag| role_for_tag(tag) == turn.role)
                    .unwrap_or_else(|| canonical_tag(&turn.role));

                let mut entry = Record::new();
                entry.insert("from".to_string(), Value::String(tag.to_string()));
                entry.insert("value".to_string(), Value::String(turn.content.clone()));
                Value::Object(entry)
            })
            .collect();

        let mut record = Record::new();
        record.insert(CONVERSATIONS_KEY.to_string(), Value::Array(conversations));
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_from_ir_fallback_table() {
        let sample = Sample::new(vec![
            Turn::system("s"),
            Turn::user("u"),
            Turn::assistant("a"),
            Turn::new(Role::Function, "f"),
            Turn::new(Role::Other("critic".to_string()), "c"),
        ]);
        let out = ShareGptStyling.from_ir(&sample).unwrap();
        let tags: Vec<_> = out["conversations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["from"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(tags, ["system", "human", "gpt", "function", "critic"]);
    }

    #[test]
    fn test_aliases() {
        let rec = record(json!({"conversations": [
            {"from": "user", "value": "hi"},
            {"from": "chatgpt", "value": "hello"},
            {"from": "observation", "value": "{}"}
        ]}));
        let sample = ShareGptStyling.to_ir(&rec).unwrap();
        let roles: Vec<_> = sample.turns.iter().map(|t| t.role.clone()).collect();
        assert_eq!(roles, [Role::User, Role::Assistant, Role::Function]);

        assert_eq!(ShareGptStyling.from_ir(&sample).unwrap(), rec);
    }

    #[test]
    fn test_alias_dropped_when_role_changes() {
        let turn = Turn::assistant("x").with_metadata(SOURCE_TAG_KEY, "user");
        let out = ShareGptStyling.from_ir(&Sample::new(vec![turn])).unwrap();
        assert_eq!(out["conversations"][0]["from"], json!("gpt"));
    }

    #[test]
    fn test_marker_read_but_not_written() {
        let rec = record(json!({"conversations": [
            {"from": "system", "value": "SYS", "_marker": "m1"},
            {"from": "human", "value": "hi"}
        ]}));
        let sample = ShareGptStyling.to_ir(&rec).unwrap();
        assert!(sample.turns[0].has_marker("m1"));

        let out = ShareGptStyling.from_ir(&sample).unwrap();
        assert_eq!(out["conversations"][0], json!({"from": "system", "value": "SYS"}));
    }

    #[test]
    fn test_malformed() {
        let err = ShareGptStyling
            .to_ir(&record(json!({"conversations": [{"from": "human"}]})))
            .unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("conversations[0]"));
    }
}
