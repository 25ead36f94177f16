use serde::ser::{
    self, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant, Serializer,
};
use serde_json::{Map, Value};

use super::{NamingPolicy, OverrideTable};
use crate::transform::Transform;

#[derive(Clone, Copy)]
struct Ctx<'a> {
    table: &'a OverrideTable,
    naming: NamingPolicy,
}

impl<'a> Ctx<'a> {
    fn wrap<'v, T: ?Sized>(self, value: &'v T) -> Filtered<'a, 'v, T> {
        Filtered { value, ctx: self }
    }

    fn resolve(self, type_name: &str, key: &str) -> Option<&'a dyn Transform> {
        self.table.resolve(type_name, key).map(|t| &**t)
    }

    fn to_value<T: ?Sized + Serialize>(self, value: &T) -> serde_json::Result<Value> {
        value.serialize(FilterSerializer {
            inner: serde_json::value::Serializer,
            ctx: self,
        })
    }

    /// Run `t` over the filtered value. `None` means the field is omitted.
    fn apply<T, E>(self, t: &dyn Transform, value: &T) -> Result<Option<Value>, E>
    where
        T: ?Sized + Serialize,
        E: ser::Error,
    {
        let v = self.to_value(value).map_err(ser::Error::custom)?;
        if t.is_empty(&v) {
            return Ok(None);
        }
        t.encode(&v).map(Some).map_err(ser::Error::custom)
    }

    /// serde emits `#[serde(flatten)]` through a map of unknown length, which
    /// drops the flattened type's name. A targeted key seen there cannot be
    /// attributed, so it fails instead of going out unfiltered.
    fn check_unattributed<K, E>(self, key: &K) -> Result<(), E>
    where
        K: ?Sized + Serialize,
        E: ser::Error,
    {
        if self.table.is_empty() {
            return Ok(());
        }
        if let Ok(Value::String(k)) = serde_json::to_value(key) {
            if self.table.targets_field(&k) {
                return Err(ser::Error::custom(format!(
                    "field `{k}` is targeted by a rule but reached through a flattened map"
                )));
            }
        }
        Ok(())
    }
}

struct Filtered<'a, 'v, T: ?Sized> {
    value: &'v T,
    ctx: Ctx<'a>,
}

impl<T: ?Sized + Serialize> Serialize for Filtered<'_, '_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(FilterSerializer {
            inner: serializer,
            ctx: self.ctx,
        })
    }
}

/// Serializer adapter that consults the override table for every struct field
/// it encounters, at any depth, and forwards everything else to `inner`
/// untouched.
///
/// Wrapping `&mut serde_json::Serializer` gives output byte-identical to
/// `serde_json::to_vec` for everything no rule touches; wrapping
/// `serde_json::value::Serializer` gives a `Value`.
pub struct FilterSerializer<'a, S> {
    inner: S,
    ctx: Ctx<'a>,
}

impl<'a, S> FilterSerializer<'a, S> {
    pub fn new(inner: S, table: &'a OverrideTable, naming: NamingPolicy) -> Self {
        Self {
            inner,
            ctx: Ctx { table, naming },
        }
    }
}

macro_rules! forward_scalars {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<S::Ok, S::Error> {
                self.inner.$method(v)
            }
        )*
    };
}

impl<'a, S: Serializer> Serializer for FilterSerializer<'a, S> {
    type Ok = S::Ok;
    type Error = S::Error;

    type SerializeSeq = Forward<'a, S::SerializeSeq>;
    type SerializeTuple = Forward<'a, S::SerializeTuple>;
    type SerializeTupleStruct = Forward<'a, S::SerializeTupleStruct>;
    type SerializeTupleVariant = Forward<'a, S::SerializeTupleVariant>;
    type SerializeMap = MapEncoder<'a, S::SerializeMap>;
    type SerializeStruct = StructEncoder<'a, S::SerializeMap>;
    type SerializeStructVariant = StructVariantEncoder<'a, S>;

    forward_scalars! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
    }

    fn serialize_none(self) -> Result<S::Ok, S::Error> {
        self.inner.serialize_none()
    }

    fn serialize_some<T>(self, value: &T) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_some(&self.ctx.wrap(value))
    }

    fn serialize_unit(self) -> Result<S::Ok, S::Error> {
        self.inner.serialize_unit()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<S::Ok, S::Error> {
        self.inner.serialize_unit_struct(name)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> Result<S::Ok, S::Error> {
        self.inner.serialize_unit_variant(name, variant_index, variant)
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_newtype_struct(name, &self.ctx.wrap(value))
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner
            .serialize_newtype_variant(name, variant_index, variant, &self.ctx.wrap(value))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, S::Error> {
        Ok(Forward {
            inner: self.inner.serialize_seq(len)?,
            ctx: self.ctx,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, S::Error> {
        Ok(Forward {
            inner: self.inner.serialize_tuple(len)?,
            ctx: self.ctx,
        })
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, S::Error> {
        Ok(Forward {
            inner: self.inner.serialize_tuple_struct(name, len)?,
            ctx: self.ctx,
        })
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, S::Error> {
        Ok(Forward {
            inner: self
                .inner
                .serialize_tuple_variant(name, variant_index, variant, len)?,
            ctx: self.ctx,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, S::Error> {
        Ok(MapEncoder {
            inner: self.inner.serialize_map(len)?,
            ctx: self.ctx,
            open_ended: len.is_none(),
        })
    }

    // Structs go out as maps so renamed keys need not be 'static. JSON
    // writes both the same way.
    fn serialize_struct(self, name: &'static str, len: usize) -> Result<Self::SerializeStruct, S::Error> {
        Ok(StructEncoder {
            inner: self.inner.serialize_map(Some(len))?,
            ctx: self.ctx,
            type_name: name,
        })
    }

    // Struct variants are keyed by the enum's declared name.
    fn serialize_struct_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, S::Error> {
        let mode = if self.ctx.naming == NamingPolicy::Preserve {
            VariantMode::Direct(
                self.inner
                    .serialize_struct_variant(name, variant_index, variant, len)?,
            )
        } else {
            VariantMode::Renamed {
                ser: self.inner,
                variant_index,
                variant,
                fields: Map::with_capacity(len),
            }
        };
        Ok(StructVariantEncoder {
            ctx: self.ctx,
            type_name: name,
            mode,
        })
    }

    fn collect_str<T>(self, value: &T) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + std::fmt::Display,
    {
        self.inner.collect_str(value)
    }

    fn is_human_readable(&self) -> bool {
        self.inner.is_human_readable()
    }
}

/// Sequence-like compound: each element is filtered, nothing else changes.
pub struct Forward<'a, M> {
    inner: M,
    ctx: Ctx<'a>,
}

impl<M: SerializeSeq> SerializeSeq for Forward<'_, M> {
    type Ok = M::Ok;
    type Error = M::Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), M::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_element(&self.ctx.wrap(value))
    }

    fn end(self) -> Result<M::Ok, M::Error> {
        self.inner.end()
    }
}

impl<M: SerializeTuple> SerializeTuple for Forward<'_, M> {
    type Ok = M::Ok;
    type Error = M::Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), M::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_element(&self.ctx.wrap(value))
    }

    fn end(self) -> Result<M::Ok, M::Error> {
        self.inner.end()
    }
}

impl<M: SerializeTupleStruct> SerializeTupleStruct for Forward<'_, M> {
    type Ok = M::Ok;
    type Error = M::Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), M::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(&self.ctx.wrap(value))
    }

    fn end(self) -> Result<M::Ok, M::Error> {
        self.inner.end()
    }
}

impl<M: SerializeTupleVariant> SerializeTupleVariant for Forward<'_, M> {
    type Ok = M::Ok;
    type Error = M::Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), M::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(&self.ctx.wrap(value))
    }

    fn end(self) -> Result<M::Ok, M::Error> {
        self.inner.end()
    }
}

pub struct MapEncoder<'a, M> {
    inner: M,
    ctx: Ctx<'a>,
    open_ended: bool,
}

impl<M: SerializeMap> SerializeMap for MapEncoder<'_, M> {
    type Ok = M::Ok;
    type Error = M::Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), M::Error>
    where
        T: ?Sized + Serialize,
    {
        if self.open_ended {
            self.ctx.check_unattributed::<T, M::Error>(key)?;
        }
        self.inner.serialize_key(key)
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), M::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_value(&self.ctx.wrap(value))
    }

    fn end(self) -> Result<M::Ok, M::Error> {
        self.inner.end()
    }
}

pub struct StructEncoder<'a, M> {
    inner: M,
    ctx: Ctx<'a>,
    type_name: &'static str,
}

impl<M: SerializeMap> SerializeStruct for StructEncoder<'_, M> {
    type Ok = M::Ok;
    type Error = M::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), M::Error>
    where
        T: ?Sized + Serialize,
    {
        let ctx = self.ctx;
        let name = ctx.naming.apply(key);
        match ctx.resolve(self.type_name, key) {
            None => self.inner.serialize_entry(&*name, &ctx.wrap(value)),
            Some(t) => match ctx.apply::<T, M::Error>(t, value)? {
                Some(v) => self.inner.serialize_entry(&*name, &v),
                None => Ok(()),
            },
        }
    }

    fn end(self) -> Result<M::Ok, M::Error> {
        self.inner.end()
    }
}

enum VariantMode<S: Serializer> {
    Direct(S::SerializeStructVariant),
    /// Renamed keys are not 'static, so the fields are collected and written
    /// as a newtype variant wrapping an object.
    Renamed {
        ser: S,
        variant_index: u32,
        variant: &'static str,
        fields: Map<String, Value>,
    },
}

pub struct StructVariantEncoder<'a, S: Serializer> {
    ctx: Ctx<'a>,
    type_name: &'static str,
    mode: VariantMode<S>,
}

impl<S: Serializer> SerializeStructVariant for StructVariantEncoder<'_, S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), S::Error>
    where
        T: ?Sized + Serialize,
    {
        let ctx = self.ctx;
        let transform = ctx.resolve(self.type_name, key);
        match &mut self.mode {
            VariantMode::Direct(inner) => match transform {
                None => inner.serialize_field(key, &ctx.wrap(value)),
                Some(t) => match ctx.apply::<T, S::Error>(t, value)? {
                    Some(v) => inner.serialize_field(key, &v),
                    None => inner.skip_field(key),
                },
            },
            VariantMode::Renamed { fields, .. } => {
                let v = match transform {
                    None => ctx.to_value(value).map_err(ser::Error::custom)?,
                    Some(t) => match ctx.apply::<T, S::Error>(t, value)? {
                        Some(v) => v,
                        None => return Ok(()),
                    },
                };
                fields.insert(ctx.naming.apply(key).into_owned(), v);
                Ok(())
            }
        }
    }

    fn end(self) -> Result<S::Ok, S::Error> {
        match self.mode {
            VariantMode::Direct(inner) => inner.end(),
            VariantMode::Renamed {
                ser,
                variant_index,
                variant,
                fields,
            } => ser.serialize_newtype_variant(
                self.type_name,
                variant_index,
                variant,
                &Value::Object(fields),
            ),
        }
    }
}
