use std::fmt;
use std::sync::Arc;

use crate::types::TypeId;

/// A 1-based position inside a named schema source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub source: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(source: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Location {
            source: source.into(),
            line,
            column,
        }
    }

    /// Location used for definitions built in code rather than parsed.
    pub fn builtin() -> Self {
        Location::new("<builtin>", 0, 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

/// The rule a schema violates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagnosticKind {
    #[error("{0}")]
    Syntax(String),

    #[error("duplicate definition of '{0}'")]
    DuplicateDefinition(String),

    #[error("duplicate field '{field}' in group '{group}'")]
    DuplicateField { group: String, field: String },

    #[error("field '{field}' in group '{group}' shadows an inherited field")]
    ShadowedField { group: String, field: String },

    #[error("undefined reference to '{0}'")]
    UndefinedReference(String),

    #[error("illegal recursive reference to '{0}'")]
    RecursiveReference(String),

    #[error("supergroup '{0}' does not name a group")]
    SuperNotGroup(String),

    #[error("supergroup reference to '{0}' must not be dynamic")]
    DynamicSuper(String),

    #[error("supergroup reference to '{0}' must not be a sequence")]
    SequenceSuper(String),

    #[error("item type '{0}' of a sequence must not itself be a sequence")]
    NestedSequence(String),

    #[error("dynamic reference to '{0}' does not name a group")]
    DynamicNonGroup(String),

    #[error("duplicate symbol '{symbol}' in enum '{name}'")]
    DuplicateSymbol { name: String, symbol: String },

    #[error("duplicate value {value} for symbol '{symbol}' in enum '{name}'")]
    DuplicateSymbolValue {
        name: String,
        symbol: String,
        value: i32,
    },

    #[error("implicit value of symbol '{symbol}' in enum '{name}' overflows i32")]
    SymbolValueOverflow { name: String, symbol: String },

    #[error("type id {type_id} of group '{name}' collides with another group")]
    DuplicateTypeId { name: String, type_id: TypeId },
}

/// A secondary location attached to a diagnostic, e.g. an earlier definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Related {
    pub label: String,
    pub location: Location,
}

/// One positioned schema problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: Location,
    pub kind: DiagnosticKind,
    pub related: Option<Related>,
}

impl Diagnostic {
    pub fn new(location: Location, kind: DiagnosticKind) -> Self {
        Diagnostic {
            location,
            kind,
            related: None,
        }
    }

    pub fn with_related(mut self, label: impl Into<String>, location: Location) -> Self {
        self.related = Some(Related {
            label: label.into(),
            location,
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.location, self.kind)?;
        if let Some(related) = &self.related {
            write!(f, "\n  {}: {}", related.label, related.location)?;
        }
        Ok(())
    }
}

/// Errors from parsing or validating a schema. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    diagnostics: Vec<Diagnostic>,
}

impl SchemaError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        debug_assert!(!diagnostics.is_empty());
        SchemaError { diagnostics }
    }

    pub fn single(diagnostic: Diagnostic) -> Self {
        SchemaError {
            diagnostics: vec![diagnostic],
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The primary (first reported) diagnostic.
    pub fn first(&self) -> &Diagnostic {
        &self.diagnostics[0]
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Errors from the fixed-point decimal type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalError {
    #[error("decimal overflow rescaling {mantissa}e-{from} to scale {to}")]
    Overflow { mantissa: i64, from: u8, to: u8 },

    #[error("rescaling {mantissa}e-{from} to scale {to} would lose digits")]
    Inexact { mantissa: i64, from: u8, to: u8 },

    #[error("scale {0} exceeds the maximum of 18")]
    ScaleTooLarge(u32),

    #[error("invalid decimal literal '{0}'")]
    Parse(String),
}

/// Errors from the compact binary reader and writer.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("truncated data: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("integer does not fit in {bits} bits")]
    Overflow { bits: u32 },

    #[error("unknown type id {0}")]
    UnknownTypeId(TypeId),

    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    #[error("message of {size} bytes exceeds the limit of {limit}")]
    MessageTooLarge { size: u64, limit: usize },

    #[error("invalid utf-8 string in field '{field}': {source}")]
    InvalidUtf8 {
        field: String,
        source: std::string::FromUtf8Error,
    },

    #[error("invalid boolean value {value} in field '{field}'")]
    InvalidBool { field: String, value: u64 },

    #[error("field '{field}' expects {expected} bytes, got {actual}")]
    FixedSizeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("value {value} out of range for {ty} field '{field}'")]
    OutOfRange {
        field: String,
        ty: String,
        value: String,
    },

    #[error("field '{field}': {source}")]
    Decimal {
        field: String,
        source: DecimalError,
    },

    #[error("field '{field}' declares static group '{expected}' but value is '{actual}'")]
    StaticGroupMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("field '{field}': group '{actual}' is not a subtype of '{expected}'")]
    NotASubtype {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("required field '{field}' of group '{group}' is missing")]
    MissingField { group: String, field: String },

    #[error("value {value} of field '{field}' is not a symbol of enum '{name}'")]
    UnknownEnumValue {
        field: String,
        name: String,
        value: i32,
    },

    #[error("symbol '{symbol}' of field '{field}' is not defined by enum '{name}'")]
    UnknownEnumSymbol {
        field: String,
        name: String,
        symbol: String,
    },

    #[error("invalid schema descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Errors raised by an `ObjectBinding` implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("binding cannot construct group '{0}'")]
    UnknownGroup(String),

    #[error("group '{group}' has no field '{field}'")]
    UnknownField { group: String, field: String },

    #[error("type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{0}")]
    Custom(String),
}

/// Top-level error type that wraps all sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Result type alias for blink operations.
pub type Result<T> = std::result::Result<T, Error>;
