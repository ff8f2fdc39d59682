//! Error types for resource transactions

use ordo_ordering::OrderingError;
use thiserror::Error;

/// A term that does not describe a valid resource transaction
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed transaction: {0}")]
    Shape(String),

    #[error("Label {label}.. does not start with {expected}")]
    MissingPrefix { expected: String, label: String },

    #[error("Invalid resource body: {0}")]
    Body(String),
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Invalid tree spec: arity {arity}, depth {depth}")]
    InvalidSpec { arity: u32, depth: u32 },

    #[error("Commitment tree is full ({capacity} leaves)")]
    TreeFull { capacity: u64 },

    #[error("Malformed commitment tree: {0}")]
    Malformed(String),
}

/// Reasons a resource transaction is rejected
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Double spend of {0}")]
    DoubleSpend(String),

    #[error("Duplicate commitment {0}")]
    DuplicateCommitment(String),

    #[error("Stale or invalid root: {0}")]
    StaleOrInvalidRoot(String),

    #[error("Stored value at {0} is not a set")]
    CorruptState(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Ordering error: {0}")]
    Ordering(#[from] OrderingError),
}
