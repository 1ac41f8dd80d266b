//! Blink: a Rust implementation of the Blink schema language and its compact
//! binary message format.
//!
//! A schema declares groups (records with optional single inheritance),
//! enums and type aliases. Messages are encoded with a variable-length
//! integer code, each top-level message prefixed by its size and a 64-bit
//! type id. Readers can also learn unknown groups in-band through schema
//! exchange.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use blink::{codec, parser, Message, Value};
//!
//! let schema = Arc::new(parser::parse(r#"
//!     namespace Demo
//!     Point/1 -> i32 X, i32 Y
//!     Line/2 -> Point From, Point To, string Label?
//! "#).unwrap());
//!
//! let line = Message::new("Demo:Line")
//!     .with("From", Message::new("Demo:Point").with("X", 1).with("Y", -2))
//!     .with("To", Message::new("Demo:Point").with("X", 3).with("Y", 4));
//!
//! let encoded = codec::encode(&schema, &line).unwrap();
//! let decoded = codec::decode(&schema, &encoded).unwrap();
//! assert_eq!(decoded, vec![line]);
//! assert_eq!(decoded[0].get("Label"), None::<&Value>);
//! ```

pub mod binding;
pub mod codec;
pub mod decimal;
pub mod error;
pub mod exchange;
pub mod parser;
pub mod printer;
pub mod types;
pub mod value;

#[cfg(feature = "serde")]
pub mod serde;

pub use binding::ObjectBinding;
pub use codec::{CompactReader, CompactWriter, ReaderOptions, WriterOptions};
pub use decimal::FixedDec;
pub use error::{BindingError, CodecError, DecimalError, Diagnostic, Error, Result, SchemaError};
pub use parser::SchemaBuilder;
pub use types::{NsName, Schema, TypeId};
pub use value::{Message, MessageBinding, Value};
