//! Error types for the Cuentas engine.

use crate::{entity::EntityKind, EntityId};
use thiserror::Error;

/// All possible errors from the Cuentas engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: EntityKind, id: EntityId },

    #[error("{kind} already exists: {id}")]
    EntityAlreadyExists { kind: EntityKind, id: EntityId },

    #[error("operation on deleted {kind}: {id}")]
    EntityDeleted { kind: EntityKind, id: EntityId },

    // Invariant violations
    #[error("{kind} is protected: {id}")]
    Protected { kind: EntityKind, id: EntityId },

    #[error("{kind} {id} is referenced by {count} entries")]
    ReferencedByEntries {
        kind: EntityKind,
        id: EntityId,
        count: usize,
    },

    // Bulk import
    #[error("import aborted: {} invalid row(s)", .0.len())]
    ImportParse(Vec<RowError>),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// A single problem found in a bulk-import row.
///
/// `line` is the 1-based line number in the source CSV (the header is line 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

impl RowError {
    pub fn new(line: u64, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
