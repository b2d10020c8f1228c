//! Raw completion text to structured payload

use crate::error::GenerationError;
use serde_json::{Map, Value};

/// Parse raw completion text into a JSON object or array
///
/// Blank text yields an empty object. No repair is attempted on malformed
/// JSON.
///
/// # Errors
/// [`GenerationError::InvalidPayload`] if the text is not valid JSON or
/// parses to a scalar.
pub fn parse_payload(stage: &str, raw: &str) -> Result<Value, GenerationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
        Ok(_) => Err(GenerationError::invalid_payload(
            stage,
            "parsed payload is not a JSON object or array",
        )),
        Err(e) => Err(GenerationError::invalid_payload(
            stage,
            format!("unable to parse payload as JSON: {e}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_is_empty_object() {
        assert_eq!(parse_payload("s", "  \n").unwrap(), json!({}));
    }

    #[test]
    fn objects_and_arrays_accepted() {
        assert_eq!(parse_payload("s", r#" {"a": 1} "#).unwrap(), json!({"a": 1}));
        assert_eq!(parse_payload("s", "[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn scalars_and_garbage_rejected() {
        for raw in ["42", "\"text\"", "null", "```json\n{}\n```", "{broken"] {
            assert!(
                matches!(
                    parse_payload("generate_problem", raw),
                    Err(GenerationError::InvalidPayload { .. })
                ),
                "{raw}"
            );
        }
    }
}
