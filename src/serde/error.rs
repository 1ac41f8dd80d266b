//! Errors from converting between Rust types and messages.

use std::fmt::Display;

use crate::error::Error;

/// Error type for serde serialization/deserialization operations.
#[derive(Debug)]
pub enum SerdeError {
    /// Type mismatch between expected and actual value types.
    TypeMismatch { expected: String, actual: String },
    /// The Rust shape has no counterpart in the message model.
    UnsupportedType(String),
    /// A `None` outside a struct field.
    UnexpectedNone,
    /// Error from the codec while encoding or decoding.
    Blink(Error),
    /// Custom error message.
    Custom(String),
}

impl Display for SerdeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerdeError::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {}, got {}", expected, actual)
            }
            SerdeError::UnsupportedType(ty) => write!(f, "unsupported type: {}", ty),
            SerdeError::UnexpectedNone => {
                write!(f, "None is only representable as an absent struct field")
            }
            SerdeError::Blink(e) => write!(f, "{}", e),
            SerdeError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SerdeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerdeError::Blink(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for SerdeError {
    fn from(e: Error) -> Self {
        SerdeError::Blink(e)
    }
}

impl serde::ser::Error for SerdeError {
    fn custom<T: Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}

impl serde::de::Error for SerdeError {
    fn custom<T: Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}
