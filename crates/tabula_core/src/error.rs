//! Error types for Tabula core.

use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Tabula core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// File manager error.
    #[error("storage error: {0}")]
    Storage(#[from] tabula_storage::StorageError),

    /// Field codec or serialization format error.
    #[error("codec error: {0}")]
    Codec(#[from] tabula_codec::CodecError),

    /// A row with the same key already exists.
    #[error("duplicate key in {entity}{}", key_suffix(.key))]
    DuplicateKey {
        /// Name of the entity kind.
        entity: String,
        /// The key, when sensitive logging is enabled.
        key: Option<String>,
    },

    /// The stored row is missing or its concurrency tokens changed.
    #[error(transparent)]
    ConcurrencyConflict(#[from] ConcurrencyConflict),

    /// A row does not match its entity kind.
    #[error("invalid row for {entity}: {message}")]
    InvalidRow {
        /// Name of the entity kind.
        entity: String,
        /// What is wrong with the row.
        message: String,
    },

    /// A value converter failed.
    #[error("cannot convert column {column}: {message}")]
    Conversion {
        /// Name of the column.
        column: String,
        /// Why conversion failed.
        message: String,
    },

    /// The model metadata is inconsistent.
    #[error("invalid model: {message}")]
    InvalidModel {
        /// Description of the problem.
        message: String,
    },

    /// A column name does not exist on the entity kind.
    #[error("unknown column {column} on {entity}")]
    UnknownColumn {
        /// Name of the entity kind.
        entity: String,
        /// The column that was asked for.
        column: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// A batch stopped at its first failure.
    ///
    /// Intents applied before the failure stay applied and were saved.
    #[error("batch aborted after {applied} applied change(s): {source}")]
    BatchAborted {
        /// Number of intents that took effect.
        applied: usize,
        /// The failure that stopped the batch.
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates a duplicate key error.
    pub fn duplicate_key(entity: impl Into<String>, key: Option<String>) -> Self {
        Self::DuplicateKey {
            entity: entity.into(),
            key,
        }
    }

    /// Creates an invalid row error.
    pub fn invalid_row(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Creates a conversion error.
    pub fn conversion(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid model error.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::InvalidModel {
            message: message.into(),
        }
    }

    /// Creates an unknown column error.
    pub fn unknown_column(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            entity: entity.into(),
            column: column.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Wraps the first failure of a batch.
    pub fn batch_aborted(applied: usize, source: CoreError) -> Self {
        Self::BatchAborted {
            applied,
            source: Box::new(source),
        }
    }

    /// Returns the underlying failure, looking through [`CoreError::BatchAborted`].
    #[must_use]
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::BatchAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the concurrency conflict behind this error, if any.
    #[must_use]
    pub fn as_concurrency_conflict(&self) -> Option<&ConcurrencyConflict> {
        match self.root_cause() {
            Self::ConcurrencyConflict(conflict) => Some(conflict),
            _ => None,
        }
    }

    /// Returns whether this error is, or wraps, a concurrency conflict.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        self.as_concurrency_conflict().is_some()
    }

    /// Returns whether this error is, or wraps, a duplicate key.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self.root_cause(), Self::DuplicateKey { .. })
    }
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref().map(|k| format!(" for key {k}")).unwrap_or_default()
}

/// An optimistic concurrency failure on one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyConflict {
    /// Name of the entity kind.
    pub entity: String,
    /// The key of the row, when sensitive logging is enabled.
    pub key: Option<String>,
    /// What went wrong.
    pub kind: ConflictKind,
}

/// The reason for a [`ConcurrencyConflict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// No row with the key is stored.
    RowMissing,
    /// Concurrency tokens differ from the caller's original values.
    TokensChanged(Vec<ConflictingColumn>),
}

/// A concurrency token whose stored value no longer matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingColumn {
    /// Name of the column.
    pub name: String,
    /// The stored value, when sensitive logging is enabled.
    pub stored_value: Option<String>,
    /// The caller's original value, when sensitive logging is enabled.
    pub expected_value: Option<String>,
}

impl ConcurrencyConflict {
    /// Returns the names of the conflicting columns.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        match &self.kind {
            ConflictKind::RowMissing => Vec::new(),
            ConflictKind::TokensChanged(columns) => {
                columns.iter().map(|c| c.name.as_str()).collect()
            }
        }
    }
}

impl fmt::Display for ConcurrencyConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "concurrency conflict on {}{}: ", self.entity, key_suffix(&self.key))?;
        match &self.kind {
            ConflictKind::RowMissing => f.write_str("the row does not exist"),
            ConflictKind::TokensChanged(columns) => {
                f.write_str("stored values changed for ")?;
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&column.name)?;
                    if let (Some(expected), Some(stored)) =
                        (&column.expected_value, &column.stored_value)
                    {
                        write!(f, " (expected {expected}, found {stored})")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConcurrencyConflict {}
