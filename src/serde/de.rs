//! Serde deserializer for converting `Value` to Rust types.

use std::collections::HashMap;

use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};

use super::error::SerdeError;
use crate::value::{Message, Value};

#[derive(Clone, Copy)]
enum Input<'de> {
    Value(&'de Value),
    Group(&'de Message),
}

/// Deserializer that reads Rust types out of a `Value` or `Message`.
pub struct BlinkDeserializer<'de> {
    input: Input<'de>,
}

impl<'de> BlinkDeserializer<'de> {
    /// Create a new deserializer from a value.
    pub fn new(value: &'de Value) -> Self {
        let input = match value {
            Value::Group(msg) => Input::Group(msg),
            other => Input::Value(other),
        };
        BlinkDeserializer { input }
    }

    /// Create a new deserializer from a group instance.
    pub fn from_message(msg: &'de Message) -> Self {
        BlinkDeserializer {
            input: Input::Group(msg),
        }
    }

    fn type_name(&self) -> &'static str {
        match self.input {
            Input::Value(v) => v.type_name(),
            Input::Group(_) => "group",
        }
    }
}

impl<'de> de::Deserializer<'de> for BlinkDeserializer<'de> {
    type Error = SerdeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let value = match self.input {
            Input::Group(msg) => return visitor.visit_map(MapAccess::new(&msg.fields)),
            Input::Value(value) => value,
        };
        match value {
            Value::Int(v) => visitor.visit_i64(*v),
            Value::UInt(v) => visitor.visit_u64(*v),
            Value::F64(v) => visitor.visit_f64(*v),
            Value::Bool(v) => visitor.visit_bool(*v),
            Value::String(v) => visitor.visit_borrowed_str(v),
            Value::Binary(v) => visitor.visit_borrowed_bytes(v),
            Value::Decimal(v) => visitor.visit_string(v.to_string()),
            Value::Enum(v) => visitor.visit_borrowed_str(v),
            Value::Group(msg) => visitor.visit_map(MapAccess::new(&msg.fields)),
            Value::Sequence(items) => visitor.visit_seq(SeqAccess::new(items)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        // Absent fields never reach the deserializer; a present one is Some.
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.input {
            Input::Value(Value::Enum(symbol)) => visitor.visit_enum(EnumAccess {
                variant: symbol,
                payload: None,
            }),
            Input::Group(msg) => visitor.visit_enum(EnumAccess {
                variant: msg.group.name(),
                payload: Some(msg),
            }),
            _ => Err(SerdeError::TypeMismatch {
                expected: "enum symbol or group".into(),
                actual: self.type_name().into(),
            }),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.input {
            Input::Group(_) => visitor.visit_unit(),
            _ => Err(SerdeError::TypeMismatch {
                expected: "group".into(),
                actual: self.type_name().into(),
            }),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf seq tuple tuple_struct map struct identifier
    }
}

/// Sequence access for deserializing sequences.
struct SeqAccess<'de> {
    iter: std::slice::Iter<'de, Value>,
}

impl<'de> SeqAccess<'de> {
    fn new(items: &'de [Value]) -> Self {
        SeqAccess { iter: items.iter() }
    }
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'de> {
    type Error = SerdeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some(value) => seed.deserialize(BlinkDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Map access over the fields of a group.
struct MapAccess<'de> {
    iter: std::collections::hash_map::Iter<'de, String, Value>,
    current_value: Option<&'de Value>,
}

impl<'de> MapAccess<'de> {
    fn new(fields: &'de HashMap<String, Value>) -> Self {
        MapAccess {
            iter: fields.iter(),
            current_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapAccess<'de> {
    type Error = SerdeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.current_value = Some(value);
                seed.deserialize(key.as_str().into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self.current_value.take().ok_or_else(|| {
            SerdeError::Custom("next_value_seed called before next_key_seed".into())
        })?;
        seed.deserialize(BlinkDeserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Enum access: a symbol selects a unit variant, a group selects the
/// newtype variant named after the group's local name.
struct EnumAccess<'de> {
    variant: &'de str,
    payload: Option<&'de Message>,
}

impl<'de> de::EnumAccess<'de> for EnumAccess<'de> {
    type Error = SerdeError;
    type Variant = VariantAccess<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        let deserializer: de::value::BorrowedStrDeserializer<'de, SerdeError> =
            de::value::BorrowedStrDeserializer::new(self.variant);
        let variant = seed.deserialize(deserializer)?;
        Ok((
            variant,
            VariantAccess {
                payload: self.payload,
            },
        ))
    }
}

struct VariantAccess<'de> {
    payload: Option<&'de Message>,
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'de> {
    type Error = SerdeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.payload {
            None => Ok(()),
            Some(_) => Err(SerdeError::TypeMismatch {
                expected: "enum symbol".into(),
                actual: "group".into(),
            }),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        match self.payload {
            Some(msg) => seed.deserialize(BlinkDeserializer::from_message(msg)),
            None => Err(SerdeError::TypeMismatch {
                expected: "group".into(),
                actual: "enum symbol".into(),
            }),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(SerdeError::UnsupportedType(
            "tuple variants have no blink representation".into(),
        ))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(SerdeError::UnsupportedType(
            "struct variants have no blink representation".into(),
        ))
    }
}
