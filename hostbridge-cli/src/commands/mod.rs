pub mod demo_cmd;
pub mod invoke_cmd;
pub mod list_cmd;
pub mod text_cmd;
pub mod void_cmd;

use hostbridge_core::{codec, Value};

/// Parse a JSON payload argument. No argument means an empty object.
pub fn parse_payload(payload: Option<&str>) -> anyhow::Result<Value> {
    match payload {
        Some(text) => codec::decode(text).map_err(|e| anyhow::anyhow!("Payload is not valid JSON: {e}")),
        None => Ok(Value::empty_object()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(None).unwrap(), Value::empty_object());
        assert_eq!(parse_payload(Some("[1]")).unwrap(), Value::Array(vec![Value::from(1)]));
        assert!(parse_payload(Some("{oops")).is_err());
    }
}
