//! Decoding of stored strings and coercion of assigned values.

use crate::error::{CodecError, CodecResult};
use crate::kind::AttrKind;
use crate::value::Value;
use tracing::warn;

/// Decodes a raw stored string into a value of `kind`.
///
/// `None` (key absent) decodes to [`Value::Null`]; the caller substitutes the
/// attribute default. Per kind:
///
/// - `string`: the text as-is
/// - `integer`: the leading decimal prefix, `0` when there is none
/// - `boolean`: exactly `"t"` is true, anything else is false
/// - `json`: parsed; anything that is not an array or object is `Null`
///
/// # Errors
///
/// Fails only for [`AttrKind::SortedSet`], which has no scalar form.
pub fn decode(raw: Option<&str>, kind: AttrKind) -> CodecResult<Value> {
    let Some(raw) = raw else {
        return match kind {
            AttrKind::SortedSet => Err(CodecError::not_scalar(kind)),
            _ => Ok(Value::Null),
        };
    };

    match kind {
        AttrKind::String => Ok(Value::Text(raw.to_string())),
        AttrKind::Integer => Ok(Value::Integer(parse_leading_integer(raw))),
        AttrKind::Boolean => Ok(Value::Bool(raw == "t")),
        AttrKind::Json => Ok(decode_json(raw)),
        AttrKind::SortedSet => Err(CodecError::not_scalar(kind)),
    }
}

/// Coerces an assigned value into the canonical decoded form for `kind`.
///
/// This is what an assignment stores in the cache, so that a later dirty
/// comparison is always between two decoded values.
///
/// # Errors
///
/// Fails only for [`AttrKind::SortedSet`].
pub fn coerce(value: Value, kind: AttrKind) -> CodecResult<Value> {
    if value.is_null() {
        return match kind {
            AttrKind::SortedSet => Err(CodecError::not_scalar(kind)),
            _ => Ok(Value::Null),
        };
    }

    let coerced = match kind {
        AttrKind::String => match value {
            Value::Text(s) => Value::Text(s),
            Value::Integer(n) => Value::Text(n.to_string()),
            Value::Bool(b) => Value::Text(b.to_string()),
            Value::Json(v) => Value::Text(v.to_string()),
            Value::Null => Value::Null,
        },
        AttrKind::Integer => match value {
            Value::Integer(n) => Value::Integer(n),
            Value::Text(s) => Value::Integer(parse_leading_integer(&s)),
            Value::Bool(b) => Value::Integer(i64::from(b)),
            Value::Json(serde_json::Value::Number(n)) => {
                Value::Integer(n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64))
            }
            Value::Json(_) | Value::Null => Value::Integer(0),
        },
        AttrKind::Boolean => match value {
            Value::Bool(b) => Value::Bool(b),
            Value::Text(s) => Value::Bool(s == "t"),
            Value::Integer(n) => Value::Bool(n != 0),
            Value::Json(_) | Value::Null => Value::Bool(false),
        },
        AttrKind::Json => match value {
            v if v.is_json_container() => v,
            Value::Text(s) => decode_json(&s),
            other => {
                warn!(value = %other, "json attributes only support array or object values");
                Value::Null
            }
        },
        AttrKind::SortedSet => return Err(CodecError::not_scalar(kind)),
    };

    Ok(coerced)
}

fn decode_json(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(parsed @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
            Value::Json(parsed)
        }
        _ => {
            warn!(raw, "json attributes only support array or object values");
            Value::Null
        }
    }
}

/// Parses the leading integer of `s` the permissive way.
///
/// Leading whitespace is skipped, one optional sign is accepted, and digits
/// may be separated by single underscores. Parsing stops at the first
/// character that does not fit; no digits at all yields `0`. Values outside
/// the `i64` range saturate.
pub fn parse_leading_integer(s: &str) -> i64 {
    let mut chars = s.trim_start().chars().peekable();

    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut acc: i64 = 0;
    let mut seen_digit = false;
    let mut last_underscore = false;

    while let Some(&c) = chars.peek() {
        if let Some(digit) = c.to_digit(10) {
            let digit = i64::from(digit);
            acc = if negative {
                acc.saturating_mul(10).saturating_sub(digit)
            } else {
                acc.saturating_mul(10).saturating_add(digit)
            };
            seen_digit = true;
            last_underscore = false;
        } else if c == '_' && seen_digit && !last_underscore {
            last_underscore = true;
        } else {
            break;
        }
        chars.next();
    }

    acc
}
