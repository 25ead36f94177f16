//! Built-in transforms: `omit` and `mask`.

use serde_json::Value;

use super::Transform;
use crate::error::Result;

const MASK_MARKER: &str = "****";

/// Drops the field regardless of its value.
#[derive(Debug, Default, Clone, Copy)]
pub struct Omit;

impl Transform for Omit {
    fn encode(&self, _value: &Value) -> Result<Value> {
        Ok(Value::Null)
    }

    fn is_empty(&self, _value: &Value) -> bool {
        true
    }
}

/// Keeps the edges of a value and hides the middle behind `****`.
///
/// Strings are masked on their characters. Other non-null values are masked
/// on their compact JSON text and always come out as strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mask;

impl Transform for Mask {
    fn encode(&self, value: &Value) -> Result<Value> {
        let masked = match value {
            Value::String(s) => mask_str(s),
            other => mask_str(&other.to_string()),
        };
        Ok(Value::String(masked))
    }

    fn is_empty(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// `"1234" -> "1****4"`, `"123456" -> "1234****3456"`.
///
/// Counts chars, not bytes. Empty input stays empty.
pub fn mask_str(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    if n == 0 {
        return String::new();
    }

    let keep = if n <= 4 { 1 } else { 4 };
    let mut out = String::with_capacity(s.len() + MASK_MARKER.len());
    out.extend(chars.iter().take(keep));
    out.push_str(MASK_MARKER);
    out.extend(chars.iter().skip(n - keep));
    out
}
