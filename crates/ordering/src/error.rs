//! Error types for the ordering engine

use ordo_common::{OrderIndex, TransactionId};
use thiserror::Error;

/// Result type for ordering operations
pub type Result<T> = std::result::Result<T, OrderingError>;

/// Ordering errors
#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("Transaction {0} was discarded before it was assigned an order index")]
    Unassigned(TransactionId),

    #[error("Transaction {0} already has an order index")]
    DuplicateAssignment(TransactionId),

    #[error("Transaction {0} already wrote its effects")]
    DuplicateWrite(TransactionId),

    #[error("Transaction {id} at index {index} cannot read at future height {height}")]
    FutureRead {
        id: TransactionId,
        index: OrderIndex,
        height: OrderIndex,
    },

    #[error("Timed out waiting to read for transaction {0}")]
    Timeout(TransactionId),

    #[error("Ordering engine shut down")]
    Closed,

    #[error("Storage error: {0}")]
    Store(#[from] ordo_store::Error),
}
