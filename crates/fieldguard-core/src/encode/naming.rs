//! External field-name casing, applied independently of filtering.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Casing convention for struct field keys on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// Keys exactly as serde reports them.
    #[default]
    Preserve,
    SnakeCase,
    CamelCase,
    PascalCase,
}

impl NamingPolicy {
    /// Render one field key.
    pub fn apply<'a>(self, key: &'a str) -> Cow<'a, str> {
        match self {
            NamingPolicy::Preserve => Cow::Borrowed(key),
            NamingPolicy::SnakeCase => Cow::Owned(words(key).join("_")),
            NamingPolicy::CamelCase => {
                let mut out = String::with_capacity(key.len());
                for (i, w) in words(key).iter().enumerate() {
                    if i == 0 {
                        out.push_str(w);
                    } else {
                        push_capitalized(&mut out, w);
                    }
                }
                Cow::Owned(out)
            }
            NamingPolicy::PascalCase => {
                let mut out = String::with_capacity(key.len());
                for w in words(key) {
                    push_capitalized(&mut out, &w);
                }
                Cow::Owned(out)
            }
        }
    }

    /// Rename every object key of an inbound JSON document.
    pub fn normalize_value(self, value: Value) -> Value {
        if self == NamingPolicy::Preserve {
            return value;
        }
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(self.apply(&k).into_owned(), self.normalize_value(v));
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.normalize_value(v)).collect())
            }
            other => other,
        }
    }
}

fn push_capitalized(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
}

/// Split an identifier into lowercase words.
///
/// Boundaries: `_`, `-`, spaces, lower->Upper, and the last capital of an
/// acronym followed by a lowercase letter (`HTTPServer` -> `http`, `server`).
fn words(ident: &str) -> Vec<String> {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = Vec::new();
    let mut cur = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            continue;
        }

        if c.is_uppercase() && !cur.is_empty() {
            let prev = chars.get(i.wrapping_sub(1)).copied();
            let next = chars.get(i + 1).copied();
            let after_lower = prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            let acronym_end =
                prev.is_some_and(char::is_uppercase) && next.is_some_and(char::is_lowercase);
            if after_lower || acronym_end {
                out.push(std::mem::take(&mut cur));
            }
        }
        cur.extend(c.to_lowercase());
    }

    if !cur.is_empty() {
        out.push(cur);
    }
    out
}
