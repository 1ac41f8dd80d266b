pub mod vlc;
pub mod encoder;
pub mod decoder;
pub mod options;

pub use decoder::CompactReader;
pub use encoder::CompactWriter;
pub use options::{ReaderOptions, WriterOptions};

use std::sync::Arc;

use crate::error::Result;
use crate::types::Schema;
use crate::value::{Message, MessageBinding};

/// Encode one `Message` as a compact top-level message.
pub fn encode(schema: &Arc<Schema>, message: &Message) -> Result<Vec<u8>> {
    let mut writer = CompactWriter::new(schema.clone(), MessageBinding, WriterOptions::default());
    writer.write(message)?;
    Ok(writer.take())
}

/// Decode every message in `data` into `Message`s.
pub fn decode(schema: &Arc<Schema>, data: &[u8]) -> Result<Vec<Message>> {
    CompactReader::new(schema.clone(), MessageBinding, ReaderOptions::default()).read_all(data)
}
