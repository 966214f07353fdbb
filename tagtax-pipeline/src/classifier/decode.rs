//! Response decoding adapter
//!
//! Free text from the classification service goes through three steps:
//! 1. [`strip_code_fences`]: drop ``` / ```json fence markers
//! 2. [`extract_json`]: cut out the first complete JSON object or array
//! 3. parse + [`ServiceReply::validate`]: check the structure the stage needs
//!
//! Every failure is a [`DecodeError`]; stages decide what it means.

use serde_json::{Deserializer, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("response contains no JSON object or array")]
    NoJson,

    #[error("response is not valid JSON: {0}")]
    Syntax(String),

    #[error("response has unexpected structure: {0}")]
    Schema(String),
}

/// A typed, validated classification reply
pub trait ServiceReply: Sized {
    fn validate(value: Value) -> Result<Self, String>;
}

/// Remove code-fence markers around (or inside) a response
///
/// Returns the content of the first fenced block when one exists, otherwise
/// the trimmed input. An unterminated fence yields everything after it.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let after_fence = &trimmed[open + 3..];
    // Skip an info string such as `json` on the opening fence line
    let body = after_fence.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Slice out the first complete JSON object or array
///
/// Each `{` / `[` is tried as a start in turn, so brackets in leading prose
/// do not hide a valid value after them.
pub fn extract_json(text: &str) -> Option<&str> {
    json_starts(text).find_map(|start| {
        let mut stream = Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(_)) => Some(&text[start..start + stream.byte_offset()]),
            _ => None,
        }
    })
}

fn json_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .map(|(index, _)| index)
}

/// Why nothing in `text` parsed, reported against the first candidate
fn syntax_error(text: &str) -> DecodeError {
    let Some(start) = json_starts(text).next() else {
        return DecodeError::NoJson;
    };
    match Deserializer::from_str(&text[start..]).into_iter::<Value>().next() {
        Some(Err(e)) => DecodeError::Syntax(e.to_string()),
        _ => DecodeError::NoJson,
    }
}

/// Decode a raw service response into a validated reply
pub fn decode_response<T: ServiceReply>(raw: &str) -> Result<T, DecodeError> {
    let body = strip_code_fences(raw);
    let json = extract_json(body).ok_or_else(|| syntax_error(body))?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| DecodeError::Syntax(e.to_string()))?;
    T::validate(value).map_err(DecodeError::Schema)
}

/// Required string field of a JSON object
pub(crate) fn required_str<'a>(object: &'a Value, field: &str) -> Result<&'a str, String> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!("field '{}' must be a string, got {}", field, type_name(other))),
        None => Err(format!("missing field '{}'", field)),
    }
}

/// Optional string field; null and missing both read as empty
pub(crate) fn optional_str<'a>(object: &'a Value, field: &str) -> Result<&'a str, String> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!("field '{}' must be a string, got {}", field, type_name(other))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Named(String);

    impl ServiceReply for Named {
        fn validate(value: Value) -> Result<Self, String> {
            required_str(&value, "name").map(|s| Named(s.to_string()))
        }
    }

    #[test]
    fn test_strip_plain_text_unchanged() {
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_bare_fence_with_surrounding_prose() {
        let raw = "Here you go:\n```\n[1, 2]\n```\nLet me know!";
        assert_eq!(strip_code_fences(raw), "[1, 2]");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_extract_json_with_prose() {
        assert_eq!(
            extract_json("Sure! {\"name\": \"x\"} hope that helps"),
            Some("{\"name\": \"x\"}")
        );
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("{\"a\": [1, 2]} and [3]"), Some("{\"a\": [1, 2]}"));
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_extract_json_skips_brackets_in_prose() {
        assert_eq!(
            extract_json("Answer [see below]: {\"name\": \"rock\"}"),
            Some("{\"name\": \"rock\"}")
        );
        let reply: Named =
            decode_response("Answer [see below]: {\"name\": \"rock\"} {oops}").unwrap();
        assert_eq!(reply, Named("rock".into()));
    }

    #[test]
    fn test_decode_success() {
        let reply: Named = decode_response("```json\n{\"name\": \"rock\"}\n```").unwrap();
        assert_eq!(reply, Named("rock".into()));
    }

    #[test]
    fn test_decode_error_classes() {
        assert_eq!(
            decode_response::<Named>("I cannot help with that"),
            Err(DecodeError::NoJson)
        );
        assert!(matches!(
            decode_response::<Named>("{\"name\": }"),
            Err(DecodeError::Syntax(_))
        ));
        assert!(matches!(
            decode_response::<Named>("{\"title\": \"x\"}"),
            Err(DecodeError::Schema(_))
        ));
    }

    #[test]
    fn test_optional_str() {
        let value: Value = serde_json::json!({"a": null, "b": "x", "c": 3});
        assert_eq!(optional_str(&value, "a").unwrap(), "");
        assert_eq!(optional_str(&value, "missing").unwrap(), "");
        assert_eq!(optional_str(&value, "b").unwrap(), "x");
        assert!(optional_str(&value, "c").is_err());
    }
}
