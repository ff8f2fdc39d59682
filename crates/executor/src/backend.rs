//! Post-processing policies for evaluation results

use ordo_common::{Term, TransactionId};
use std::fmt;
use tokio::sync::mpsc;

/// Where a reply for a read-only transaction goes
pub type ReplyTo = mpsc::UnboundedSender<(TransactionId, Term)>;

/// How a transaction's evaluation result is turned into effects
#[derive(Clone)]
pub enum Backend {
    /// Send the result to `reply_to`; write nothing
    ReadOnly { reply_to: ReplyTo },
    /// The result is a list of `[key value]` pairs to store
    KeyValue,
    /// Store the result under its SHA-256 digest
    Blob,
    /// The result is a resource transaction to verify and apply
    ResourceMachine,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::ReadOnly { .. } => "read-only",
            Backend::KeyValue => "key-value",
            Backend::Blob => "blob",
            Backend::ResourceMachine => "resource-machine",
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transaction's program, either in compact form or already decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    Encoded(Vec<u8>),
    Decoded(Term),
}

impl From<Term> for Program {
    fn from(term: Term) -> Self {
        Program::Decoded(term)
    }
}

impl From<Vec<u8>> for Program {
    fn from(bytes: Vec<u8>) -> Self {
        Program::Encoded(bytes)
    }
}
