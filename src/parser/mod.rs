pub mod ast;
pub mod grammar;
pub mod lexer;
pub mod schema_builder;
mod validate;

pub use grammar::parse_schema;
pub use schema_builder::SchemaBuilder;

use crate::error::SchemaError;
use crate::types::Schema;

/// Parse and finalize a single schema text.
///
/// This is the main entry point for the parser module. Use a
/// `SchemaBuilder` to combine several sources.
pub fn parse(schema_text: &str) -> Result<Schema, SchemaError> {
    let mut builder = SchemaBuilder::new();
    builder.parse_str("<input>", schema_text)?;
    builder.finalize()
}
