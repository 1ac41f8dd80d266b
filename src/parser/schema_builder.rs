use super::ast::Definition;
use super::grammar;
use super::validate;
use crate::error::SchemaError;
use crate::types::{NsName, Schema};

/// Collects definitions from any number of sources, then validates them
/// together into an immutable `Schema`.
///
/// References may point forward and across sources; nothing is resolved
/// until `finalize`.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    definitions: Vec<Definition>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Add one programmatically constructed definition.
    pub fn add(&mut self, def: impl Into<Definition>) -> &mut Self {
        self.definitions.push(def.into());
        self
    }

    /// Parse schema text and add its definitions. `source` names the text in
    /// diagnostics. On a syntax error nothing is added.
    pub fn parse_str(&mut self, source: &str, text: &str) -> Result<&mut Self, SchemaError> {
        let defs = grammar::parse_schema(source, text)?;
        self.definitions.extend(defs);
        Ok(self)
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn contains(&self, name: &NsName) -> bool {
        self.definitions.iter().any(|d| d.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolve and validate everything added so far.
    ///
    /// The builder is left untouched, so calling this again yields an equal
    /// schema; the returned `Schema` itself can no longer change.
    pub fn finalize(&self) -> Result<Schema, SchemaError> {
        validate::build(&self.definitions)
    }
}
