use std::sync::Arc;

use tracing::trace;

use crate::binding::ObjectBinding;
use crate::error::{CodecError, Result};
use crate::exchange::ExchangeEncoder;
use crate::types::{Field, Primitive, Resolved, Schema};
use crate::value::Value;

use super::options::WriterOptions;
use super::vlc;

/// Writes objects as length-prefixed compact messages into a growing buffer.
///
/// ```rust
/// use std::sync::Arc;
/// use blink::codec::{CompactWriter, WriterOptions};
/// use blink::value::{Message, MessageBinding};
///
/// let schema = Arc::new(blink::parser::parse("Hello -> string Greeting").unwrap());
/// let mut writer = CompactWriter::new(schema, MessageBinding, WriterOptions::default());
/// writer.write(&Message::new("Hello").with("Greeting", "hi")).unwrap();
/// assert!(!writer.buffer().is_empty());
/// ```
pub struct CompactWriter<B: ObjectBinding> {
    schema: Arc<Schema>,
    binding: B,
    buffer: Vec<u8>,
    exchange: Option<ExchangeEncoder>,
}

impl<B: ObjectBinding> CompactWriter<B> {
    pub fn new(schema: Arc<Schema>, binding: B, options: WriterOptions) -> Self {
        CompactWriter {
            schema,
            binding,
            buffer: Vec::with_capacity(options.initial_capacity),
            exchange: options.schema_exchange.then(ExchangeEncoder::new),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Append one top-level message. On error the buffer is left as it was.
    pub fn write(&mut self, object: &B::Object) -> Result<()> {
        let start = self.buffer.len();
        let mut enc = Encoder::new(&self.schema, &self.binding, &mut self.buffer);
        if let Err(e) = enc.write_message(object) {
            self.buffer.truncate(start);
            return Err(e);
        }
        let used = enc.used;

        if let Some(exchange) = &mut self.exchange {
            let mut descriptors = Vec::new();
            if let Err(e) = exchange.announce(&self.schema, &used, &mut descriptors) {
                self.buffer.truncate(start);
                return Err(e);
            }
            if !descriptors.is_empty() {
                self.buffer.splice(start..start, descriptors);
            }
        }

        trace!(
            group = %self.schema.group(used[0]).name,
            size = self.buffer.len() - start,
            "wrote message"
        );
        Ok(())
    }

    /// Everything written so far.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Take the written bytes, leaving the writer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard written bytes. Groups already announced stay announced.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Encodes objects for one schema into `out`.
pub(crate) struct Encoder<'a, B: ObjectBinding> {
    schema: &'a Schema,
    binding: &'a B,
    out: &'a mut Vec<u8>,
    /// Groups whose type id was written, top-level group first.
    pub(crate) used: Vec<usize>,
}

impl<'a, B: ObjectBinding> Encoder<'a, B> {
    pub(crate) fn new(schema: &'a Schema, binding: &'a B, out: &'a mut Vec<u8>) -> Self {
        Encoder {
            schema,
            binding,
            out,
            used: Vec::new(),
        }
    }

    /// Length prefix, type id, then all fields.
    pub(crate) fn write_message(&mut self, object: &B::Object) -> Result<()> {
        let idx = self.group_index(object)?;
        self.write_dynamic_body(idx, object)
    }

    fn group_index(&self, object: &B::Object) -> Result<usize> {
        let name = self.binding.group_of(object)?;
        Ok(self
            .schema
            .group_index(&name)
            .ok_or_else(|| CodecError::UnknownGroup(name.to_string()))?)
    }

    /// Run `body`, then insert its encoded length in front of what it wrote.
    fn length_prefixed(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let start = self.out.len();
        body(self)?;
        let len = (self.out.len() - start) as u64;
        let mut prefix = Vec::with_capacity(vlc::MAX_ENCODED_LEN);
        vlc::encode_unsigned(len, &mut prefix);
        self.out.splice(start..start, prefix);
        Ok(())
    }

    fn write_dynamic_body(&mut self, idx: usize, object: &B::Object) -> Result<()> {
        self.used.push(idx);
        let schema = self.schema;
        self.length_prefixed(|enc| {
            vlc::encode_unsigned(schema.group(idx).type_id.value(), enc.out);
            enc.write_fields(idx, object)
        })
    }

    fn write_fields(&mut self, idx: usize, object: &B::Object) -> Result<()> {
        let schema = self.schema;
        let group = schema.group(idx);
        for field in &group.all_fields {
            match self.binding.get(object, field)? {
                Some(value) => self.write_field(field, value)?,
                // Absent is a zero presence indicator, an empty sequence
                // count or an empty dynamic group, all a single 0 byte.
                None if field.optional => self.out.push(0),
                None => {
                    return Err(CodecError::MissingField {
                        group: group.name.to_string(),
                        field: field.name.clone(),
                    }
                    .into())
                }
            }
        }
        Ok(())
    }

    fn write_field(&mut self, field: &Field, value: Value<&B::Object>) -> Result<()> {
        let ty = field.resolved;
        if ty.sequence {
            let items = match value {
                Value::Sequence(items) => items,
                other => return Err(mismatch(field, "sequence", &other)),
            };
            vlc::encode_unsigned(items.len() as u64, self.out);
            for item in items {
                self.write_value(field, ty.kind, item)?;
            }
            return Ok(());
        }

        if field.optional && !matches!(ty.kind, Resolved::DynamicGroup(_)) {
            self.out.push(1);
        }
        self.write_value(field, ty.kind, value)
    }

    fn write_value(&mut self, field: &Field, kind: Resolved, value: Value<&B::Object>) -> Result<()> {
        match kind {
            Resolved::Primitive(p) => self.write_primitive(field, p, value),
            Resolved::Fixed(size) => {
                let bytes = match value {
                    Value::Binary(bytes) => bytes,
                    other => return Err(mismatch(field, "binary", &other)),
                };
                if bytes.len() != size as usize {
                    return Err(CodecError::FixedSizeMismatch {
                        field: field.name.clone(),
                        expected: size as usize,
                        actual: bytes.len(),
                    }
                    .into());
                }
                self.out.extend_from_slice(&bytes);
                Ok(())
            }
            Resolved::FixedDec(scale) => {
                let decimal = match value {
                    Value::Decimal(d) => d,
                    Value::Int(i) => i.into(),
                    Value::String(ref s) => s.parse().map_err(|source| CodecError::Decimal {
                        field: field.name.clone(),
                        source,
                    })?,
                    other => return Err(mismatch(field, "decimal", &other)),
                };
                let scaled = decimal.rescale(scale).map_err(|source| CodecError::Decimal {
                    field: field.name.clone(),
                    source,
                })?;
                vlc::encode_signed(scaled.mantissa(), self.out);
                Ok(())
            }
            Resolved::Enum(e) => {
                let enumeration = self.schema.enumeration(e);
                let symbol_value = match value {
                    Value::Enum(ref symbol) => {
                        enumeration
                            .symbol_by_name(symbol)
                            .ok_or_else(|| CodecError::UnknownEnumSymbol {
                                field: field.name.clone(),
                                name: enumeration.name.to_string(),
                                symbol: symbol.clone(),
                            })?
                            .value
                    }
                    Value::Int(i) => {
                        let v = i32::try_from(i).ok().filter(|v| enumeration.symbol_by_value(*v).is_some());
                        v.ok_or_else(|| CodecError::OutOfRange {
                            field: field.name.clone(),
                            ty: enumeration.name.to_string(),
                            value: i.to_string(),
                        })?
                    }
                    other => return Err(mismatch(field, "enum symbol", &other)),
                };
                vlc::encode_signed(symbol_value as i64, self.out);
                Ok(())
            }
            Resolved::StaticGroup(expected) => {
                let object = match value {
                    Value::Group(object) => object,
                    other => return Err(mismatch(field, "group", &other)),
                };
                let actual = self.group_index(object)?;
                if actual != expected {
                    return Err(CodecError::StaticGroupMismatch {
                        field: field.name.clone(),
                        expected: self.schema.group(expected).name.to_string(),
                        actual: self.schema.group(actual).name.to_string(),
                    }
                    .into());
                }
                self.length_prefixed(|enc| enc.write_fields(actual, object))
            }
            Resolved::DynamicGroup(declared) => {
                let object = match value {
                    Value::Group(object) => object,
                    other => return Err(mismatch(field, "group", &other)),
                };
                let actual = self.group_index(object)?;
                if !self.schema.is_subtype(actual, declared) {
                    return Err(CodecError::NotASubtype {
                        field: field.name.clone(),
                        expected: self.schema.group(declared).name.to_string(),
                        actual: self.schema.group(actual).name.to_string(),
                    }
                    .into());
                }
                self.write_dynamic_body(actual, object)
            }
        }
    }

    fn write_primitive(&mut self, field: &Field, p: Primitive, value: Value<&B::Object>) -> Result<()> {
        if let Some((bits, signed)) = p.integer_width() {
            let out_of_range = |v: &dyn std::fmt::Display| CodecError::OutOfRange {
                field: field.name.clone(),
                ty: p.keyword().to_string(),
                value: v.to_string(),
            };
            if signed {
                let v = match value {
                    Value::Int(i) => i,
                    Value::UInt(u) => i64::try_from(u).map_err(|_| out_of_range(&u))?,
                    other => return Err(mismatch(field, p.keyword(), &other)),
                };
                if bits < 64 && !(-(1i64 << (bits - 1))..(1i64 << (bits - 1))).contains(&v) {
                    return Err(out_of_range(&v).into());
                }
                vlc::encode_signed(v, self.out);
            } else {
                let v = match value {
                    Value::UInt(u) => u,
                    Value::Int(i) => u64::try_from(i).map_err(|_| out_of_range(&i))?,
                    other => return Err(mismatch(field, p.keyword(), &other)),
                };
                if bits < 64 && v >> bits != 0 {
                    return Err(out_of_range(&v).into());
                }
                vlc::encode_unsigned(v, self.out);
            }
            return Ok(());
        }

        match (p, value) {
            (Primitive::F64, Value::F64(f)) => vlc::encode_unsigned(f.to_bits(), self.out),
            (Primitive::F64, Value::Int(i)) => vlc::encode_unsigned((i as f64).to_bits(), self.out),
            (Primitive::Bool, Value::Bool(b)) => vlc::encode_unsigned(b as u64, self.out),
            (Primitive::String, Value::String(s)) => self.write_bytes(s.as_bytes()),
            (Primitive::Binary, Value::Binary(b)) => self.write_bytes(&b),
            (_, other) => return Err(mismatch(field, p.keyword(), &other)),
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        vlc::encode_unsigned(bytes.len() as u64, self.out);
        self.out.extend_from_slice(bytes);
    }
}

fn mismatch<G>(field: &Field, expected: &str, actual: &Value<G>) -> crate::error::Error {
    CodecError::TypeMismatch {
        field: field.name.clone(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
    .into()
}
