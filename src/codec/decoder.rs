use std::sync::Arc;

use tracing::{debug, trace};

use crate::binding::ObjectBinding;
use crate::decimal::FixedDec;
use crate::error::{CodecError, Result};
use crate::exchange::ExchangeDecoder;
use crate::types::{Field, Primitive, Resolved, Schema, TypeId};
use crate::value::Value;

use super::options::ReaderOptions;
use super::vlc;

/// Reads length-prefixed compact messages, possibly split across chunks.
///
/// Complete messages are handed to the sink as soon as they arrive; a
/// partial message is buffered until the rest is fed.
pub struct CompactReader<B: ObjectBinding> {
    schema: Arc<Schema>,
    binding: B,
    max_message_size: Option<usize>,
    pending: Vec<u8>,
    exchange: Option<ExchangeDecoder>,
}

impl<B: ObjectBinding> CompactReader<B> {
    pub fn new(schema: Arc<Schema>, binding: B, options: ReaderOptions) -> Self {
        let exchange = options
            .schema_exchange
            .then(|| ExchangeDecoder::new(&schema));
        CompactReader {
            schema,
            binding,
            max_message_size: options.max_message_size,
            pending: Vec::new(),
            exchange,
        }
    }

    /// The schema messages are currently decoded against, including groups
    /// learned through schema exchange.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Decode every complete message in `chunk` (after any bytes buffered by
    /// earlier calls). Returns the number of objects delivered.
    ///
    /// Any error aborts the stream: buffered bytes are dropped.
    pub fn feed<F>(&mut self, chunk: &[u8], mut sink: F) -> Result<usize>
    where
        F: FnMut(B::Object),
    {
        if self.pending.is_empty() {
            let (consumed, count) = self.process(chunk, &mut sink)?;
            self.pending.extend_from_slice(&chunk[consumed..]);
            return Ok(count);
        }

        self.pending.extend_from_slice(chunk);
        let pending = std::mem::take(&mut self.pending);
        let (consumed, count) = self.process(&pending, &mut sink)?;
        self.pending = pending;
        self.pending.drain(..consumed);
        Ok(count)
    }

    /// Signal end of input. Fails if a partial message is still buffered.
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let have = self.pending.len();
        let need = match vlc::decode_unsigned(&self.pending, 64) {
            Ok((len, n)) => n.saturating_add(len as usize),
            Err(_) => have + 1,
        };
        self.pending.clear();
        Err(CodecError::Truncated { need, have }.into())
    }

    /// Decode a complete buffer.
    pub fn read<F>(&mut self, data: &[u8], sink: F) -> Result<usize>
    where
        F: FnMut(B::Object),
    {
        let count = self.feed(data, sink)?;
        self.finish()?;
        Ok(count)
    }

    /// Decode a complete buffer into a vector.
    pub fn read_all(&mut self, data: &[u8]) -> Result<Vec<B::Object>> {
        let mut out = Vec::new();
        self.read(data, |obj| out.push(obj))?;
        Ok(out)
    }

    /// Decode the complete messages at the front of `data`. Returns bytes
    /// consumed and objects delivered.
    fn process<F>(&mut self, data: &[u8], sink: &mut F) -> Result<(usize, usize)>
    where
        F: FnMut(B::Object),
    {
        let mut pos = 0;
        let mut count = 0;
        while pos < data.len() {
            let (len, prefix) = match vlc::decode_unsigned(&data[pos..], 64) {
                Ok(v) => v,
                Err(CodecError::Truncated { .. }) => break,
                Err(e) => return Err(e.into()),
            };
            if let Some(limit) = self.max_message_size {
                if len > limit as u64 {
                    return Err(CodecError::MessageTooLarge { size: len, limit }.into());
                }
            }
            let remaining = (data.len() - pos - prefix) as u64;
            if len > remaining {
                break;
            }
            let start = pos + prefix;
            let end = start + len as usize;
            if let Some(obj) = self.handle_message(&data[start..end])? {
                sink(obj);
                count += 1;
            }
            pos = end;
        }
        Ok((pos, count))
    }

    fn handle_message(&mut self, body: &[u8]) -> Result<Option<B::Object>> {
        if let Some(exchange) = &mut self.exchange {
            let (type_id, _) = vlc::decode_unsigned(body, 64)?;
            if exchange.is_descriptor(TypeId(type_id)) {
                exchange.register(body)?;
                return Ok(None);
            }
            if let Some(schema) = exchange.refresh()? {
                self.schema = schema;
            }
        }

        let mut dec = Decoder::new(&self.schema, &self.binding, body);
        let obj = dec.read_dynamic_body(None)?;
        trace!(size = body.len(), "read message");
        Ok(Some(obj))
    }
}

/// Decodes fields from a slice bounded by the enclosing length prefix.
pub(crate) struct Decoder<'a, B: ObjectBinding> {
    schema: &'a Schema,
    binding: &'a B,
    data: &'a [u8],
    pos: usize,
}

impl<'a, B: ObjectBinding> Decoder<'a, B> {
    pub(crate) fn new(schema: &'a Schema, binding: &'a B, data: &'a [u8]) -> Self {
        Decoder {
            schema,
            binding,
            data,
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_unsigned(&mut self, bits: u32) -> Result<u64> {
        let (v, n) = vlc::decode_unsigned(&self.data[self.pos..], bits)?;
        self.pos += n;
        Ok(v)
    }

    fn read_signed(&mut self, bits: u32) -> Result<i64> {
        let (v, n) = vlc::decode_signed(&self.data[self.pos..], bits)?;
        self.pos += n;
        Ok(v)
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_unsigned(64)?;
        if len > self.remaining() as u64 {
            return Err(CodecError::Truncated {
                need: usize::try_from(len).unwrap_or(usize::MAX),
                have: self.remaining(),
            }
            .into());
        }
        Ok(len as usize)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                need: n,
                have: self.remaining(),
            }
            .into());
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// A decoder over the next `len` bytes, which are consumed here.
    fn sub(&mut self, len: usize) -> Result<Decoder<'a, B>> {
        let bytes = self.read_bytes(len)?;
        Ok(Decoder::new(self.schema, self.binding, bytes))
    }

    fn read_presence(&mut self, field: &Field) -> Result<bool> {
        match self.read_unsigned(8)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidBool {
                field: field.name.clone(),
                value,
            }
            .into()),
        }
    }

    /// Type id then fields, checking the type against `declared` if given.
    pub(crate) fn read_dynamic_body(&mut self, declared: Option<(&Field, usize)>) -> Result<B::Object> {
        let type_id = TypeId(self.read_unsigned(64)?);
        let idx = self
            .schema
            .group_index_by_type_id(type_id)
            .ok_or(CodecError::UnknownTypeId(type_id))?;
        if let Some((field, expected)) = declared {
            if !self.schema.is_subtype(idx, expected) {
                return Err(CodecError::NotASubtype {
                    field: field.name.clone(),
                    expected: self.schema.group(expected).name.to_string(),
                    actual: self.schema.group(idx).name.to_string(),
                }
                .into());
            }
        }
        self.read_fields(idx)
    }

    /// All fields of group `idx`; bytes left over are extensions and skipped.
    fn read_fields(&mut self, idx: usize) -> Result<B::Object> {
        let schema = self.schema;
        let group = schema.group(idx);
        let mut object = self.binding.construct(group)?;
        for field in &group.all_fields {
            if let Some(value) = self.read_field(field)? {
                self.binding.set(&mut object, field, value)?;
            }
        }
        if self.remaining() > 0 {
            debug!(
                group = %group.name,
                bytes = self.remaining(),
                "skipping trailing extension bytes"
            );
            self.pos = self.data.len();
        }
        Ok(object)
    }

    fn read_field(&mut self, field: &Field) -> Result<Option<Value<B::Object>>> {
        let ty = field.resolved;
        if ty.sequence {
            let count = self.read_unsigned(64)?;
            if count == 0 && field.optional {
                return Ok(None);
            }
            // Every element takes at least one byte, except empty fixed
            // items.
            let sized = ty.kind != Resolved::Fixed(0);
            if sized && count > self.remaining() as u64 {
                return Err(CodecError::Truncated {
                    need: usize::try_from(count).unwrap_or(usize::MAX),
                    have: self.remaining(),
                }
                .into());
            }
            let mut items = Vec::with_capacity(count.min(self.remaining() as u64) as usize);
            for _ in 0..count {
                items.push(self.read_value(field, ty.kind)?);
            }
            return Ok(Some(Value::Sequence(items)));
        }

        if field.optional {
            if let Resolved::DynamicGroup(declared) = ty.kind {
                let len = self.read_len()?;
                if len == 0 {
                    return Ok(None);
                }
                let mut sub = self.sub(len)?;
                return Ok(Some(Value::Group(sub.read_dynamic_body(Some((field, declared)))?)));
            }
            if !self.read_presence(field)? {
                return Ok(None);
            }
        }
        self.read_value(field, ty.kind).map(Some)
    }

    fn read_value(&mut self, field: &Field, kind: Resolved) -> Result<Value<B::Object>> {
        let value = match kind {
            Resolved::Primitive(p) => self.read_primitive(field, p)?,
            Resolved::Fixed(size) => Value::Binary(self.read_bytes(size as usize)?.to_vec()),
            Resolved::FixedDec(scale) => {
                let mantissa = self.read_signed(64)?;
                let decimal = FixedDec::new(mantissa, scale).map_err(|source| CodecError::Decimal {
                    field: field.name.clone(),
                    source,
                })?;
                Value::Decimal(decimal)
            }
            Resolved::Enum(e) => {
                let raw = self.read_signed(32)? as i32;
                let enumeration = self.schema.enumeration(e);
                let symbol = enumeration
                    .symbol_by_value(raw)
                    .ok_or_else(|| CodecError::UnknownEnumValue {
                        field: field.name.clone(),
                        name: enumeration.name.to_string(),
                        value: raw,
                    })?;
                Value::Enum(symbol.name.clone())
            }
            Resolved::StaticGroup(idx) => {
                let len = self.read_len()?;
                Value::Group(self.sub(len)?.read_fields(idx)?)
            }
            Resolved::DynamicGroup(declared) => {
                let len = self.read_len()?;
                Value::Group(self.sub(len)?.read_dynamic_body(Some((field, declared)))?)
            }
        };
        Ok(value)
    }

    fn read_primitive(&mut self, field: &Field, p: Primitive) -> Result<Value<B::Object>> {
        let value = match p {
            Primitive::I8 => Value::Int(self.read_signed(8)?),
            Primitive::I16 => Value::Int(self.read_signed(16)?),
            Primitive::I32 => Value::Int(self.read_signed(32)?),
            Primitive::I64 => Value::Int(self.read_signed(64)?),
            Primitive::U8 => Value::UInt(self.read_unsigned(8)?),
            Primitive::U16 => Value::UInt(self.read_unsigned(16)?),
            Primitive::U32 => Value::UInt(self.read_unsigned(32)?),
            Primitive::U64 => Value::UInt(self.read_unsigned(64)?),
            Primitive::F64 => Value::F64(f64::from_bits(self.read_unsigned(64)?)),
            Primitive::Bool => match self.read_unsigned(64)? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                value => {
                    return Err(CodecError::InvalidBool {
                        field: field.name.clone(),
                        value,
                    }
                    .into())
                }
            },
            Primitive::String => {
                let len = self.read_len()?;
                let bytes = self.read_bytes(len)?.to_vec();
                let s = String::from_utf8(bytes).map_err(|source| CodecError::InvalidUtf8 {
                    field: field.name.clone(),
                    source,
                })?;
                Value::String(s)
            }
            Primitive::Binary => {
                let len = self.read_len()?;
                Value::Binary(self.read_bytes(len)?.to_vec())
            }
        };
        Ok(value)
    }
}
