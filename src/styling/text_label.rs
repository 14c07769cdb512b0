use super::{Styling, join_contents, json_type_name, required_str, unsupported_role};
use crate::error::{Error, Result};
use crate::format::Record;
use crate::ir::{Role, Sample, Turn};
use serde_json::Value;

const NAME: &str = "text_label";

/// Turn metadata key set when the label was a number or a boolean.
const LABEL_JSON_KEY: &str = "label_json";

/// `{"text", "label"}`
///
/// | role | field |
/// |---|---|
/// | system | prepended to `text` with a newline |
/// | user | joined into `text` |
/// | assistant | joined into `label` |
/// | function, other | no fallback |
///
/// Numeric and boolean labels keep their JSON type through a round trip.
/// Other turn metadata, injection markers included, is not written.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLabelStyling;

impl Styling for TextLabelStyling {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, record: &Record) -> bool {
        record.contains_key("text") && record.contains_key("label")
    }

    fn to_ir(&self, record: &Record) -> Result<Sample> {
        let text = required_str(NAME, record, "text")?;

        let label = match record.get("label") {
            Some(Value::String(label)) => Turn::assistant(label.as_str()),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => {
                Turn::assistant(value.to_string()).with_metadata(LABEL_JSON_KEY, "true")
            }
            Some(other) => {
                return Err(Error::malformed(
                    NAME,
                    format!(
                        "'label' must be a string, number or boolean, got {}",
                        json_type_name(other)
                    ),
                ));
            }
            None => return Err(Error::malformed(NAME, "missing required key 'label'")),
        };

        Ok(Sample::new(vec![Turn::user(text), label]))
    }

    fn from_ir(&self, sample: &Sample) -> Result<Record> {
        if let Some(turn) = sample
            .turns
            .iter()
            .find(|turn| matches!(turn.role, Role::Function | Role::Other(_)))
        {
            return Err(unsupported_role(NAME, &turn.role));
        }

        let system: Vec<_> = sample.turns_with_role(&Role::System).collect();
        let texts: Vec<_> = sample.turns_with_role(&Role::User).collect();
        let labels: Vec<_> = sample.turns_with_role(&Role::Assistant).collect();

        let text = match (system.is_empty(), texts.is_empty()) {
            (true, _) => join_contents(texts),
            (false, true) => join_contents(system),
            (false, false) => format!("{}\n{}", join_contents(system), join_contents(texts)),
        };

        let label = match labels.as_slice() {
            [single] if single.meta(LABEL_JSON_KEY).is_some() => {
                serde_json::from_str::<Value>(&single.content)
                    .ok()
                    .filter(|v| v.is_number() || v.is_boolean())
                    .unwrap_or_else(|| Value::String(single.content.clone()))
            }
            _ => Value::String(join_contents(labels.iter().copied())),
        };

        let mut record = Record::new();
        record.insert("text".to_string(), Value::String(text));
        record.insert("label".to_string(), label);
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
    fn test_to_ir() {
        let sample = TextLabelStyling
            .to_ir(&record(json!({"text": "great movie", "label": "positive"})))
            .unwrap();
        assert_eq!(
            sample.turns,
            vec![Turn::user("great movie"), Turn::assistant("positive")]
        );
    }

    #[test]
    fn test_numeric_label_keeps_type() {
        for label in [json!(1), json!(0.5), json!(true)] {
            let rec = record(json!({"text": "t", "label": label}));
            let sample = TextLabelStyling.to_ir(&rec).unwrap();
            assert_eq!(TextLabelStyling.from_ir(&sample).unwrap(), rec);
        }
    }

    #[test]
    fn test_invalid_label() {
        let err = TextLabelStyling
            .to_ir(&record(json!({"text": "t", "label": ["a"]})))
            .unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("got array"));
    }

    #[test]
    fn test_system_prepended_to_text() {
        let sample = Sample::new(vec![
            Turn::system("ctx"),
            Turn::user("q"),
            Turn::assistant("a"),
        ]);
        let out = TextLabelStyling.from_ir(&sample).unwrap();
        assert_eq!(out, record(json!({"text": "ctx\nq", "label": "a"})));
    }

    #[test]
    fn test_interleaved_turns_grouped_by_role() {
        let sample = Sample::new(vec![
            Turn::user("a"),
            Turn::assistant("x"),
            Turn::user("b"),
            Turn::assistant("y"),
        ]);
        let out = TextLabelStyling.from_ir(&sample).unwrap();
        assert_eq!(out, record(json!({"text": "a\nb", "label": "x\ny"})));
    }

    #[test]
    fn test_other_role_has_no_fallback() {
        let sample = Sample::new(vec![Turn::new(Role::Other("tool".into()), "x")]);
        assert!(TextLabelStyling.from_ir(&sample).unwrap_err().is_malformed());
    }
}
