//! Serde integration for blink messages.
//!
//! Converts `#[derive(Serialize, Deserialize)]` types to and from the
//! `Message` model, which the compact codec then encodes against a schema.
//!
//! Mapping rules:
//! - a struct is a group; its Rust name (or `#[serde(rename = "ns:Name")]`)
//!   names the group, its fields are the group's fields;
//! - `Option::None` fields are left out, so they travel as absent;
//! - unit enum variants are enum symbols;
//! - an enum of newtype variants wrapping structs is a dynamic group field;
//!   on the way back the variant is picked by the group's local name;
//! - `FixedDec` travels as its decimal string;
//! - use `serde_bytes` for `binary` and `fixed(N)` fields.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! #[serde(rename = "Demo:Point")]
//! struct Point {
//!     #[serde(rename = "X")]
//!     x: i32,
//!     #[serde(rename = "Y")]
//!     y: i32,
//! }
//!
//! let schema = Arc::new(blink::parser::parse("namespace Demo\nPoint/1 -> i32 X, i32 Y").unwrap());
//! let bytes = blink::serde::to_bytes(&schema, &Point { x: 1, y: -2 }).unwrap();
//! let back: Vec<Point> = blink::serde::from_bytes(&schema, &bytes).unwrap();
//! assert_eq!(back, vec![Point { x: 1, y: -2 }]);
//! ```

mod de;
mod error;
mod ser;

pub use de::BlinkDeserializer;
pub use error::SerdeError;
pub use ser::BlinkSerializer;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::types::Schema;
use crate::value::{Message, Value};

/// Serialize a struct to a `Message`.
pub fn to_message<T: Serialize>(value: &T) -> Result<Message, SerdeError> {
    match BlinkSerializer::serialize(value)? {
        Value::Group(msg) => Ok(msg),
        other => Err(SerdeError::TypeMismatch {
            expected: "group".into(),
            actual: other.type_name().into(),
        }),
    }
}

/// Deserialize a `Message` into a Rust type.
pub fn from_message<'de, T: Deserialize<'de>>(msg: &'de Message) -> Result<T, SerdeError> {
    T::deserialize(BlinkDeserializer::from_message(msg))
}

/// Serialize any value to `Value` without encoding it.
pub fn to_value<T: Serialize>(value: &T) -> Result<Value, SerdeError> {
    BlinkSerializer::serialize(value)
}

/// Deserialize a `Value` to a Rust type.
pub fn from_value<'de, T: Deserialize<'de>>(value: &'de Value) -> Result<T, SerdeError> {
    T::deserialize(BlinkDeserializer::new(value))
}

/// Serialize a struct and encode it as one compact message.
pub fn to_bytes<T: Serialize>(schema: &Arc<Schema>, value: &T) -> Result<Vec<u8>, SerdeError> {
    let msg = to_message(value)?;
    Ok(codec::encode(schema, &msg)?)
}

/// Decode every message in `data` and deserialize each one.
pub fn from_bytes<T: DeserializeOwned>(schema: &Arc<Schema>, data: &[u8]) -> Result<Vec<T>, SerdeError> {
    codec::decode(schema, data)?
        .iter()
        .map(|msg| from_message(msg))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::FixedDec;
    use crate::parser;
    use crate::types::NsName;
    use pretty_assertions::assert_eq;

    fn test_schema() -> Arc<Schema> {
        Arc::new(
            parser::parse(
                "namespace Shop\n\
                 Side = Buy | Sell\n\
                 Item -> string name, u32 qty\n\
                 Shape/1 -> string label\n\
                 Circle/2 : Shape -> u32 radius\n\
                 Square/3 : Shape -> u32 side\n\
                 Order/10 -> u64 id, Side side, fixedDec(2) price, Item [] items, \
                 string note?, Shape* shape?, binary tag",
            )
            .unwrap(),
        )
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Side {
        Buy,
        Sell,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename = "Shop:Item")]
    struct Item {
        name: String,
        qty: u32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename = "Shop:Circle")]
    struct Circle {
        label: String,
        radius: u32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename = "Shop:Square")]
    struct Square {
        label: String,
        side: u32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum AnyShape {
        Circle(Circle),
        Square(Square),
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename = "Shop:Order")]
    struct Order {
        id: u64,
        side: Side,
        price: FixedDec,
        items: Vec<Item>,
        note: Option<String>,
        shape: Option<AnyShape>,
        #[serde(with = "serde_bytes")]
        tag: Vec<u8>,
    }

    fn sample() -> Order {
        Order {
            id: u64::MAX,
            side: Side::Sell,
            price: "19.90".parse().unwrap(),
            items: vec![
                Item {
                    name: "pen".into(),
                    qty: 3,
                },
                Item {
                    name: "ink".into(),
                    qty: 1,
                },
            ],
            note: None,
            shape: Some(AnyShape::Square(Square {
                label: "box".into(),
                side: 4,
            })),
            tag: vec![0xde, 0xad],
        }
    }

    #[test]
    fn test_to_message() {
        let msg = to_message(&sample()).unwrap();
        assert_eq!(msg.group, NsName::qualified("Shop", "Order"));
        assert_eq!(msg.get("id"), Some(&Value::UInt(u64::MAX)));
        assert_eq!(msg.get("side"), Some(&Value::symbol("Sell")));
        assert!(msg.get("note").is_none());
        let shape = msg.get("shape").and_then(Value::as_group).unwrap();
        assert_eq!(shape.group, NsName::qualified("Shop", "Square"));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let schema = test_schema();
        let order = sample();
        let bytes = to_bytes(&schema, &order).unwrap();
        let decoded: Vec<Order> = from_bytes(&schema, &bytes).unwrap();
        assert_eq!(decoded, vec![order]);
    }

    #[test]
    fn test_decoded_decimal_keeps_field_scale() {
        let schema = test_schema();
        let mut order = sample();
        order.price = FixedDec::from_int(20);
        let bytes = to_bytes(&schema, &order).unwrap();
        let decoded: Vec<Order> = from_bytes(&schema, &bytes).unwrap();
        assert_eq!(decoded[0].price.scale(), 2);
        assert_eq!(decoded[0].price, FixedDec::from_int(20));
    }

    #[test]
    fn test_from_value() {
        let value = Value::Sequence(vec![Value::UInt(1), Value::UInt(2)]);
        let numbers: Vec<u8> = from_value(&value).unwrap();
        assert_eq!(numbers, [1, 2]);
    }

    #[test]
    fn test_to_message_rejects_scalars() {
        assert!(matches!(
            to_message(&42i32),
            Err(SerdeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_variant_group() {
        let msg = Message::new("Shop:Triangle").with("label", "t");
        let result: Result<AnyShape, _> = from_message(&msg);
        assert!(result.is_err());
    }
}
