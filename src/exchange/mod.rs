//! In-band schema exchange.
//!
//! A writer with exchange enabled precedes the first message of every group
//! with descriptor messages (encoded against the built-in meta schema) for
//! that group and everything it depends on. A reader with exchange enabled
//! learns those definitions and can then decode data it had no schema for.

pub mod meta;
pub mod describe;
mod decoder;

pub use describe::{build_transitive, definition_from_message, describe};
pub use meta::{meta_schema, meta_schema_text};

pub(crate) use decoder::ExchangeDecoder;

use std::collections::HashSet;

use tracing::debug;

use crate::codec::encoder::Encoder;
use crate::error::Result;
use crate::types::{NsName, Schema};
use crate::value::{Message, MessageBinding};

/// Descriptor messages for `root` and its dependencies, dependencies first.
pub fn descriptors(schema: &Schema, root: &NsName) -> Result<Vec<Message>> {
    Ok(build_transitive(schema, root)?
        .into_iter()
        .map(|def| describe(schema, def))
        .collect())
}

/// Encode a descriptor message as a compact top-level message.
pub fn encode_descriptor(msg: &Message, out: &mut Vec<u8>) -> Result<()> {
    Encoder::new(meta_schema(), &MessageBinding, out).write_message(msg)
}

/// Tracks which definitions a writer has already announced.
pub(crate) struct ExchangeEncoder {
    announced: HashSet<NsName>,
}

impl ExchangeEncoder {
    pub(crate) fn new() -> Self {
        ExchangeEncoder {
            announced: HashSet::new(),
        }
    }

    /// Encode descriptors for `groups` (and their dependencies) that have
    /// not been announced yet. Nothing is marked announced on error.
    pub(crate) fn announce(&mut self, schema: &Schema, groups: &[usize], out: &mut Vec<u8>) -> Result<()> {
        let mut fresh: HashSet<NsName> = HashSet::new();
        for &idx in groups {
            let root = &schema.group(idx).name;
            if self.announced.contains(root) || fresh.contains(root) {
                continue;
            }
            for def in build_transitive(schema, root)? {
                let name = schema.def_name(def);
                if self.announced.contains(name) || !fresh.insert(name.clone()) {
                    continue;
                }
                debug!(name = %name, "announcing definition");
                encode_descriptor(&describe(schema, def), out)?;
            }
        }
        self.announced.extend(fresh);
        Ok(())
    }
}
