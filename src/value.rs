use std::collections::HashMap;
use std::fmt;

use crate::binding::ObjectBinding;
use crate::decimal::FixedDec;
use crate::error::BindingError;
use crate::types::{Field, Group, NsName};

/// A dynamically typed field value.
///
/// `G` is the representation of nested groups: `Message` for the map-based
/// model, a binding's own object type otherwise, or a reference to one when
/// the writer borrows fields out of an object.
#[derive(Clone, Debug)]
pub enum Value<G = Message> {
    /// Any signed integer field (i8..i64).
    Int(i64),
    /// Any unsigned integer field (u8..u64).
    UInt(u64),
    F64(f64),
    Bool(bool),
    String(String),
    /// `binary` and `fixed(N)` fields.
    Binary(Vec<u8>),
    Decimal(FixedDec),
    /// An enum field, by symbol name.
    Enum(String),
    Group(G),
    Sequence(Vec<Value<G>>),
}

impl<G> Value<G> {
    /// An enum symbol value.
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Enum(name.into())
    }

    /// Borrow the nested groups.
    pub fn as_ref(&self) -> Value<&G> {
        match self {
            Value::Int(v) => Value::Int(*v),
            Value::UInt(v) => Value::UInt(*v),
            Value::F64(v) => Value::F64(*v),
            Value::Bool(v) => Value::Bool(*v),
            Value::String(v) => Value::String(v.clone()),
            Value::Binary(v) => Value::Binary(v.clone()),
            Value::Decimal(v) => Value::Decimal(*v),
            Value::Enum(v) => Value::Enum(v.clone()),
            Value::Group(g) => Value::Group(g),
            Value::Sequence(items) => Value::Sequence(items.iter().map(Value::as_ref).collect()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<FixedDec> {
        match self {
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&G> {
        match self {
            Value::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value<G>]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns a short type description string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Decimal(_) => "decimal",
            Value::Enum(_) => "enum symbol",
            Value::Group(_) => "group",
            Value::Sequence(_) => "sequence",
        }
    }
}

impl<G: PartialEq> PartialEq for Value<G> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Group(a), Value::Group(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            _ => false,
        }
    }
}

impl<G: fmt::Display> fmt::Display for Value<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Binary(v) => write!(f, "<binary {} bytes>", v.len()),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Enum(v) => f.write_str(v),
            Value::Group(g) => write!(f, "{}", g),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

// Conversion traits
impl<G> From<i64> for Value<G> {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl<G> From<i32> for Value<G> {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl<G> From<u64> for Value<G> {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl<G> From<u32> for Value<G> {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl<G> From<f64> for Value<G> {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl<G> From<bool> for Value<G> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<G> From<String> for Value<G> {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<G> From<&str> for Value<G> {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<G> From<Vec<u8>> for Value<G> {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl<G> From<FixedDec> for Value<G> {
    fn from(v: FixedDec) -> Self {
        Value::Decimal(v)
    }
}

impl<G> From<Vec<Value<G>>> for Value<G> {
    fn from(v: Vec<Value<G>>) -> Self {
        Value::Sequence(v)
    }
}

impl From<Message> for Value {
    fn from(m: Message) -> Self {
        Value::Group(m)
    }
}

/// A group instance as a name plus a field map.
///
/// The schema-agnostic object model: what the reader produces when the
/// application has no types of its own, and what schema exchange uses for
/// its descriptors.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub group: NsName,
    pub fields: HashMap<String, Value>,
}

impl Message {
    pub fn new(group: impl Into<NsName>) -> Self {
        Message {
            group: group.into(),
            fields: HashMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn group(&self) -> &NsName {
        &self.group
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.fields.keys().collect();
        names.sort();
        write!(f, "{} {{ ", self.group)?;
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, self.fields[name])?;
        }
        write!(f, " }}")
    }
}

/// `ObjectBinding` over `Message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageBinding;

impl ObjectBinding for MessageBinding {
    type Object = Message;

    fn construct(&self, group: &Group) -> Result<Message, BindingError> {
        Ok(Message::new(group.name.clone()))
    }

    fn group_of(&self, object: &Message) -> Result<NsName, BindingError> {
        Ok(object.group.clone())
    }

    fn get<'a>(
        &self,
        object: &'a Message,
        field: &Field,
    ) -> Result<Option<Value<&'a Message>>, BindingError> {
        Ok(object.fields.get(&field.name).map(Value::as_ref))
    }

    fn set(&self, object: &mut Message, field: &Field, value: Value) -> Result<(), BindingError> {
        object.fields.insert(field.name.clone(), value);
        Ok(())
    }
}
