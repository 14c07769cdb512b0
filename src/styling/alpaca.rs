use super::{Styling, join_contents, optional_str, required_str, unsupported_role};
use crate::error::Result;
use crate::format::Record;
use crate::ir::{Role, Sample, Turn};
use serde_json::Value;

const NAME: &str = "alpaca";

/// `{"instruction", "input"?, "output"}`
///
/// | role | field |
/// |---|---|
/// | system | prepended to `instruction` with a newline |
/// | user | first turn is `instruction`, later turns are joined into `input` |
/// | assistant | joined into `output` |
/// | function, other | no fallback |
///
/// An empty `input` is treated as absent and never written. Turn metadata,
/// injection markers included, has no field here and is not written.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlpacaStyling;

impl Styling for AlpacaStyling {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, record: &Record) -> bool {
        record.contains_key("instruction") && record.contains_key("output")
    }

    fn to_ir(&self, record: &Record) -> Result<Sample> {
        let instruction = required_str(NAME, record, "instruction")?;
        let output = required_str(NAME, record, "output")?;
        let input = optional_str(NAME, record, "input")?.filter(|input| !input.is_empty());

        let mut turns = vec![Turn::user(instruction)];
        if let Some(input) = input {
            turns.push(Turn::user(input));
        }
        turns.push(Turn::assistant(output));

        Ok(Sample::new(turns))
    }

    fn from_ir(&self, sample: &Sample) -> Result<Record> {
        let mut system = Vec::new();
        let mut instruction: Option<&str> = None;
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        for turn in &sample.turns {
            match &turn.role {
                Role::System => system.push(turn),
                Role::User if instruction.is_none() => instruction = Some(turn.content.as_str()),
                Role::User => inputs.push(turn),
                Role::Assistant => outputs.push(turn),
                role @ (Role::Function | Role::Other(_)) => {
                    return Err(unsupported_role(NAME, role));
                }
            }
        }

        let instruction = match (system.is_empty(), instruction) {
            (true, first) => first.unwrap_or_default().to_string(),
            (false, None) => join_contents(system),
            (false, Some(first)) => format!("{}\n{first}", join_contents(system)),
        };
        let input = join_contents(inputs);

        let mut record = Record::new();
        record.insert("instruction".to_string(), Value::String(instruction));
        if !input.is_empty() {
            record.insert("input".to_string(), Value::String(input));
        }
        record.insert("output".to_string(), Value::String(join_contents(outputs)));
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
    fn test_missing_output_is_malformed() {
        let err = AlpacaStyling
            .to_ir(&record(json!({"instruction": "x"})))
            .unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn test_empty_input_not_reproduced() {
        let rec = record(json!({"instruction": "Say hi", "input": "", "output": "hi"}));
        let sample = AlpacaStyling.to_ir(&rec).unwrap();
        assert_eq!(sample.len(), 2);

        let out = AlpacaStyling.from_ir(&sample).unwrap();
        assert_eq!(out, record(json!({"instruction": "Say hi", "output": "hi"})));
    }

    #[test]
    fn test_system_prepended_to_instruction() {
        let sample = Sample::new(vec![
            Turn::system("Be brief."),
            Turn::user("Hello"),
            Turn::assistant("Hi"),
        ]);
        let out = AlpacaStyling.from_ir(&sample).unwrap();
        assert_eq!(out["instruction"], json!("Be brief.\nHello"));
        assert_eq!(out["output"], json!("Hi"));
    }

    #[test]
    fn test_multi_turn_is_joined() {
        let sample = Sample::new(vec![
            Turn::user("q1"),
            Turn::assistant("a1"),
            Turn::user("q2"),
            Turn::user("q3"),
            Turn::assistant("a2"),
        ]);
        let out = AlpacaStyling.from_ir(&sample).unwrap();
        assert_eq!(
            out,
            record(json!({"instruction": "q1", "input": "q2\nq3", "output": "a1\na2"}))
        );
    }

    #[test]
    fn test_no_assistant_gives_empty_output() {
        let out = AlpacaStyling
            .from_ir(&Sample::new(vec![Turn::user("q")]))
            .unwrap();
        assert_eq!(out["output"], json!(""));
    }

    #[test]
    fn test_function_role_has_no_fallback() {
        let sample = Sample::new(vec![Turn::user("q"), Turn::new(Role::Function, "{}")]);
        let err = AlpacaStyling.from_ir(&sample).unwrap_err();
        assert!(err.is_malformed());
    }
}
