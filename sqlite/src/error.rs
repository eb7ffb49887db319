//! Error types for the inventory store.
//!
//! [`StoreError`] covers everything the data-access layer can report;
//! [`SchemaError`] is the fatal startup failure raised when an existing
//! database cannot be brought to the declared schema additively.

use thiserror::Error;
use tower_inventory_core::{Id, ValidationError};

/// An existing database structure that conflicts with the declared schema.
///
/// Every variant names the table and column involved. These are reported,
/// never auto-resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Column exists with a different type affinity.
    #[error("{table}.{column}: declared as {found}, expected {expected}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        found: String,
    },
    /// Column is NOT NULL but the current model stores NULL in it.
    #[error("{table}.{column}: existing NOT NULL constraint conflicts with optional field")]
    UnexpectedNotNull { table: String, column: String },
    /// Column carries a UNIQUE constraint the current model does not allow.
    #[error("{table}.{column}: existing UNIQUE constraint conflicts with non-unique field")]
    UnexpectedUnique { table: String, column: String },
    /// Declared primary key column is not the table's primary key.
    #[error("{table}.{column}: expected to be the primary key")]
    PrimaryKeyMismatch { table: String, column: String },
    /// Missing column cannot be added with `ALTER TABLE .. ADD COLUMN`.
    #[error("{table}.{column}: cannot be added to existing table ({reason})")]
    CannotAddColumn {
        table: String,
        column: String,
        reason: &'static str,
    },
    /// Existing column outside the model is NOT NULL without a default.
    #[error("{table}.{column}: required column is not part of the current model")]
    UnknownRequiredColumn { table: String, column: String },
}

impl SchemaError {
    pub fn table(&self) -> &str {
        match self {
            Self::TypeMismatch { table, .. }
            | Self::UnexpectedNotNull { table, .. }
            | Self::UnexpectedUnique { table, .. }
            | Self::PrimaryKeyMismatch { table, .. }
            | Self::CannotAddColumn { table, .. }
            | Self::UnknownRequiredColumn { table, .. } => table,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::TypeMismatch { column, .. }
            | Self::UnexpectedNotNull { column, .. }
            | Self::UnexpectedUnique { column, .. }
            | Self::PrimaryKeyMismatch { column, .. }
            | Self::CannotAddColumn { column, .. }
            | Self::UnknownRequiredColumn { column, .. } => column,
        }
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Input failed a format or range rule.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The transaction would take stock below zero.
    #[error("insufficient stock for item {item_id}: {available} available, {requested} requested")]
    InsufficientStock {
        item_id: Id,
        available: i64,
        requested: i64,
    },

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Id },

    /// Delete blocked because other rows still reference this one.
    #[error("cannot delete {entity} {id}: referenced by {count} {dependent}")]
    ReferentialIntegrity {
        entity: &'static str,
        id: Id,
        dependent: &'static str,
        count: i64,
    },

    /// A row with the same unique name already exists.
    #[error("{entity} '{name}' already exists")]
    AlreadyExists { entity: &'static str, name: String },

    /// Mutation attempted on a store opened in office mode.
    #[error("store is read-only in office mode")]
    ReadOnly,

    /// Existing database conflicts with the declared schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Stored value could not be decoded.
    #[error("conversion error: {0}")]
    ConversionError(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
