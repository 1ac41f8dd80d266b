/// Settings for a `CompactWriter`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct WriterOptions {
    /// Emit schema descriptors ahead of the first message of each group.
    pub schema_exchange: bool,
    /// Bytes reserved for the output buffer up front. It grows as needed.
    pub initial_capacity: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            schema_exchange: false,
            initial_capacity: 4096,
        }
    }
}

/// Settings for a `CompactReader`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct ReaderOptions {
    /// Accept schema descriptors in the stream and learn groups from them.
    pub schema_exchange: bool,
    /// Reject messages whose length prefix exceeds this many bytes.
    pub max_message_size: Option<usize>,
}
