//! The interface to the program evaluator

use async_trait::async_trait;
use ordo_common::{Term, TransactionId};
use ordo_ordering::{OrderingEngine, Result};
use std::sync::Arc;

/// Evaluates a decoded program
///
/// Errors are plain messages: they end the transaction and are reported in
/// its result and completion events.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, program: Term, scry: &Scry) -> std::result::Result<Term, String>;
}

/// Read view of storage for one transaction
///
/// Reads see exactly the writes ordered before the transaction, and wait
/// until those are in.
#[derive(Clone)]
pub struct Scry {
    id: TransactionId,
    ordering: Arc<OrderingEngine>,
}

impl Scry {
    pub fn new(id: TransactionId, ordering: Arc<OrderingEngine>) -> Self {
        Self { id, ordering }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub async fn read(&self, key: &[u8]) -> Result<Option<Term>> {
        self.ordering.read(&self.id, key).await
    }

    pub async fn read_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Term)>> {
        self.ordering.read_prefix(&self.id, prefix).await
    }
}
