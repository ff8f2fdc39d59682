//! Error types for transaction execution

use ordo_common::TermError;
use ordo_ordering::OrderingError;
use ordo_resource::VerifyError;
use thiserror::Error;

/// Why a transaction failed
///
/// Every variant ends the transaction with a failure completion carrying the
/// error's message.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Decode error: {0}")]
    Decode(#[from] TermError),

    #[error("VM error: {0}")]
    Vm(String),

    #[error("Malformed result: {0}")]
    MalformedResult(String),

    #[error("Reserved key: 0x{}", hex::encode(.0))]
    ReservedKey(Vec<u8>),

    #[error("Verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error("Ordering error: {0}")]
    Ordering(#[from] OrderingError),

    #[error("Storage error: {0}")]
    Store(#[from] ordo_store::Error),
}
