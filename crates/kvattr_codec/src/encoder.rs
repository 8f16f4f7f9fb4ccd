//! Encoding of attribute values into their stored string form.

use crate::decoder::coerce;
use crate::error::CodecResult;
use crate::kind::AttrKind;
use crate::value::Value;

/// Boolean `true` as stored.
pub const TRUE_TOKEN: &str = "t";
/// Boolean `false` as stored.
pub const FALSE_TOKEN: &str = "f";

/// Encodes `value` as the string stored for an attribute of `kind`.
///
/// The value is coerced to `kind` first, so callers may pass raw assigned
/// values. `Ok(None)` means "no value": the attribute should be absent from
/// the store (this is what a `json` value of any shape other than array or
/// object encodes to).
///
/// # Errors
///
/// Fails only for [`AttrKind::SortedSet`].
pub fn encode(value: &Value, kind: AttrKind) -> CodecResult<Option<String>> {
    let encoded = match coerce(value.clone(), kind)? {
        Value::Null => None,
        Value::Text(s) => Some(s),
        Value::Integer(n) => Some(n.to_string()),
        Value::Bool(true) => Some(TRUE_TOKEN.to_string()),
        Value::Bool(false) => Some(FALSE_TOKEN.to_string()),
        Value::Json(v) => Some(v.to_string()),
    };
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use serde_json::json;

    #[test]
    fn encode_boolean_tokens() {
        assert_eq!(encode(&Value::Bool(true), AttrKind::Boolean).unwrap().as_deref(), Some("t"));
        assert_eq!(encode(&Value::Bool(false), AttrKind::Boolean).unwrap().as_deref(), Some("f"));
    }

    #[test]
    fn encode_integer_stringifies() {
        assert_eq!(encode(&Value::Integer(-3), AttrKind::Integer).unwrap().as_deref(), Some("-3"));
        assert_eq!(encode(&Value::from("5"), AttrKind::Integer).unwrap().as_deref(), Some("5"));
    }

    #[test]
    fn encode_json_invalid_shapes_are_absent() {
        assert_eq!(encode(&Value::Integer(11), AttrKind::Json).unwrap(), None);
        assert_eq!(encode(&Value::from("abc"), AttrKind::Json).unwrap(), None);
    }

    #[test]
    fn encode_json_containers() {
        assert_eq!(
            encode(&Value::Json(json!([1])), AttrKind::Json).unwrap().as_deref(),
            Some("[1]")
        );
        assert_eq!(
            encode(&Value::Json(json!({"a": 1})), AttrKind::Json).unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
    }

    #[test]
    fn encode_null_is_absent() {
        assert_eq!(encode(&Value::Null, AttrKind::String).unwrap(), None);
    }

    #[test]
    fn empty_string_survives() {
        let raw = encode(&Value::from(""), AttrKind::String).unwrap();
        assert_eq!(raw.as_deref(), Some(""));
        assert_eq!(decode(raw.as_deref(), AttrKind::String).unwrap(), Value::from(""));
    }
}
