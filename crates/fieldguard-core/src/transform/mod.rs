//! Named field transforms and the registry that resolves them.
//!
//! A transform decides how a single field value is rendered, or whether the
//! field is dropped from the output object altogether. Transforms are looked
//! up by name when a request is filtered, so a policy file may reference a
//! transform that is registered after the rules were loaded.

mod builtin;

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::Result;

pub use builtin::{mask_str, Mask, Omit};

/// Built-in transform names (plus their legacy aliases).
pub const OMIT: &str = "omit";
pub const OMIT_ALIAS: &str = "remove";
pub const MASK: &str = "mask";
pub const MASK_ALIAS: &str = "sensitive";

/// Field-level encoder contract.
pub trait Transform: Send + Sync {
    /// Render the field value. Only called when `is_empty` returned false.
    fn encode(&self, value: &Value) -> Result<Value>;

    /// `true` means the field key is omitted from the output entirely.
    fn is_empty(&self, value: &Value) -> bool;
}

/// Adapter turning a pair of closures into a [`Transform`].
pub struct FnTransform<E, P> {
    encode: E,
    is_empty: P,
}

impl<E, P> FnTransform<E, P>
where
    E: Fn(&Value) -> Result<Value> + Send + Sync,
    P: Fn(&Value) -> bool + Send + Sync,
{
    pub fn new(encode: E, is_empty: P) -> Self {
        Self { encode, is_empty }
    }
}

impl<E> FnTransform<E, fn(&Value) -> bool>
where
    E: Fn(&Value) -> Result<Value> + Send + Sync,
{
    /// Transform that never omits its field.
    pub fn encode_only(encode: E) -> Self {
        Self {
            encode,
            is_empty: never_empty,
        }
    }
}

fn never_empty(_: &Value) -> bool {
    false
}

impl<E, P> Transform for FnTransform<E, P>
where
    E: Fn(&Value) -> Result<Value> + Send + Sync,
    P: Fn(&Value) -> bool + Send + Sync,
{
    fn encode(&self, value: &Value) -> Result<Value> {
        (self.encode)(value)
    }

    fn is_empty(&self, value: &Value) -> bool {
        (self.is_empty)(value)
    }
}

/// Process-wide transform registry.
///
/// Registration replaces the whole entry under the shard lock, so concurrent
/// readers see either the previous transform or the new one.
pub struct TransformRegistry {
    entries: DashMap<String, Arc<dyn Transform>>,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformRegistry {
    /// Empty registry (no built-ins).
    pub fn empty() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Registry pre-populated with `omit`/`remove` and `mask`/`sensitive`.
    pub fn with_builtins() -> Self {
        let reg = Self::empty();
        let omit: Arc<dyn Transform> = Arc::new(Omit);
        let mask: Arc<dyn Transform> = Arc::new(Mask);
        reg.register_arc(OMIT, Arc::clone(&omit));
        reg.register_arc(OMIT_ALIAS, omit);
        reg.register_arc(MASK, Arc::clone(&mask));
        reg.register_arc(MASK_ALIAS, mask);
        reg
    }

    /// Register `transform` under `name`. Last registration wins.
    pub fn register<T: Transform + 'static>(&self, name: impl Into<String>, transform: T) {
        self.register_arc(name, Arc::new(transform));
    }

    pub fn register_arc(&self, name: impl Into<String>, transform: Arc<dyn Transform>) {
        let name = name.into();
        if self.entries.insert(name.clone(), transform).is_some() {
            tracing::debug!(transform = %name, "transform re-registered (last write wins)");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.entries.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
