//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while converting values or whole tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A field's text could not be parsed as its declared type.
    #[error("cannot read {text:?} as {type_name}: {reason}")]
    Format {
        /// Name of the declared type.
        type_name: String,
        /// The offending text.
        text: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Failed to produce a table blob.
    #[error("encoding failed: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to parse a table blob.
    #[error("decoding failed: {message}")]
    Decoding {
        /// Description of the decoding error.
        message: String,
    },

    /// The blob parsed but does not describe a valid table.
    #[error("invalid table structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// No serialization format has the given identifier.
    #[error("unknown format: {name}")]
    UnknownFormat {
        /// The identifier that was asked for.
        name: String,
    },
}

impl CodecError {
    /// Create a field format error.
    pub fn format(
        type_name: impl Into<String>,
        text: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Format {
            type_name: type_name.into(),
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error.
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unknown format error.
    pub fn unknown_format(name: impl Into<String>) -> Self {
        Self::UnknownFormat { name: name.into() }
    }
}
