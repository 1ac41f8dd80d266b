use std::sync::Arc;

use tracing::debug;

use crate::codec::decoder::Decoder;
use crate::error::{Location, Result};
use crate::parser::SchemaBuilder;
use crate::types::{Schema, TypeId};
use crate::value::MessageBinding;

use super::describe::definition_from_message;
use super::meta::{meta_schema, meta_type_id};

/// Learns definitions from descriptor messages in a stream.
///
/// Owned by one reader. Definitions accumulate in a private builder; the
/// schema is re-finalized lazily, right before the next data message, so
/// descriptors may arrive in any order within a batch.
pub(crate) struct ExchangeDecoder {
    builder: SchemaBuilder,
    group_def: Option<TypeId>,
    define: Option<TypeId>,
    received: u32,
    dirty: bool,
}

impl ExchangeDecoder {
    pub(crate) fn new(schema: &Schema) -> Self {
        ExchangeDecoder {
            builder: schema.to_builder(),
            group_def: meta_type_id("GroupDef"),
            define: meta_type_id("Define"),
            received: 0,
            dirty: false,
        }
    }

    pub(crate) fn is_descriptor(&self, type_id: TypeId) -> bool {
        Some(type_id) == self.group_def || Some(type_id) == self.define
    }

    /// Decode one descriptor message body and queue its definition.
    pub(crate) fn register(&mut self, body: &[u8]) -> Result<()> {
        let meta = meta_schema();
        let msg = Decoder::new(meta, &MessageBinding, body).read_dynamic_body(None)?;
        self.received += 1;
        let location = Location::new("<exchange>", self.received, 1);
        let def = definition_from_message(&msg, location)?;

        if self.builder.contains(def.name()) {
            debug!(name = %def.name(), "definition already known, skipping");
            return Ok(());
        }
        debug!(name = %def.name(), "registered definition from stream");
        self.builder.add(def);
        self.dirty = true;
        Ok(())
    }

    /// Finalize pending definitions. Returns the new schema if anything changed.
    pub(crate) fn refresh(&mut self) -> Result<Option<Arc<Schema>>> {
        if !self.dirty {
            return Ok(None);
        }
        let schema = Arc::new(self.builder.finalize()?);
        debug!(groups = schema.groups().len(), "schema updated from stream");
        self.dirty = false;
        Ok(Some(schema))
    }
}
