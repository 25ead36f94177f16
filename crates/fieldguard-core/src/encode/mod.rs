//! Override engine: per-type, per-field transform table and the serializer
//! that consults it.
//!
//! Dispatch is keyed strictly on `(declared type name, field key)` as serde
//! reports them: the struct name passed to `serialize_struct` and the field
//! key passed to `serialize_field`. Nothing is inherited from an enclosing
//! type and nothing is matched by position.

mod naming;
mod ser;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{FilterError, Result};
use crate::policy::MatchedRule;
use crate::transform::Transform;

pub use naming::NamingPolicy;
pub use ser::FilterSerializer;

type FieldOverrides = HashMap<String, Arc<dyn Transform>>;

/// type name -> field key -> transform.
#[derive(Clone, Default)]
pub struct OverrideTable {
    types: HashMap<String, FieldOverrides>,
    /// Every targeted field key, whatever its type.
    fields: HashSet<String>,
}

impl OverrideTable {
    /// Expand matched rules. Later rules win on the same (type, field).
    pub fn build(matched: &[MatchedRule]) -> Self {
        let mut types: HashMap<String, FieldOverrides> = HashMap::new();
        let mut keys = HashSet::new();
        for m in matched {
            if m.rule.is_inert() {
                continue;
            }
            let fields = types.entry(m.rule.model_name.clone()).or_default();
            for field in &m.rule.fields {
                fields.insert(field.clone(), Arc::clone(&m.transform));
                keys.insert(field.clone());
            }
        }
        Self { types, fields: keys }
    }

    pub fn resolve(&self, type_name: &str, field: &str) -> Option<&Arc<dyn Transform>> {
        self.types.get(type_name)?.get(field)
    }

    /// True if some type has an override for `field`.
    pub fn targets_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl std::fmt::Debug for OverrideTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        for (ty, fields) in &self.types {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            m.entry(ty, &keys);
        }
        m.finish()
    }
}

/// Serialize `payload` into a JSON value through the override table.
pub fn to_filtered_value<T>(payload: &T, table: &OverrideTable, naming: NamingPolicy) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    payload
        .serialize(FilterSerializer::new(serde_json::value::Serializer, table, naming))
        .map_err(|e| FilterError::Serialize(e.to_string()))
}

/// Serialize `payload` into compact JSON bytes through the override table.
///
/// Everything no rule touches is written by serde_json itself, so it is
/// byte-identical to `serde_json::to_vec`.
pub fn to_filtered_vec<T>(payload: &T, table: &OverrideTable, naming: NamingPolicy) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    if table.is_empty() && naming == NamingPolicy::Preserve {
        return serde_json::to_vec(payload).map_err(|e| FilterError::Serialize(e.to_string()));
    }
    let mut ser = serde_json::Serializer::new(Vec::with_capacity(128));
    payload
        .serialize(FilterSerializer::new(&mut ser, table, naming))
        .map_err(|e| FilterError::Serialize(e.to_string()))?;
    Ok(ser.into_inner())
}
