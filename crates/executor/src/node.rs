//! The transaction pipeline
//!
//! ```text
//! Received -> Decoded -> Evaluated -> PostProcessed -> Completed
//!     \           \            \              \
//!      +-----------+------------+--------------+---> Failed
//! ```
//!
//! Whatever happens, a transaction writes exactly once through the ordering
//! engine (empty effects on failure) and publishes exactly one completion.

use crate::backend::{Backend, Program};
use crate::config::NodeConfig;
use crate::error::ExecError;
use crate::evaluator::{Evaluator, Scry};
use ordo_common::{Outcome, Term, TransactionId};
use ordo_events::{CompleteEvent, EventBus, NullifierEvent, ResultEvent};
use ordo_ordering::OrderingEngine;
use ordo_resource::{Nullifier, ResourceVerifier, Transaction};
use ordo_store::{Effects, FjallStore, VersionedStore, is_reserved};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What a successful transaction writes and reports
struct Completion {
    effects: Effects,
    result: Term,
    nullifiers: Option<BTreeSet<Term>>,
}

impl Completion {
    fn new(effects: Effects, result: Term) -> Self {
        Self {
            effects,
            result,
            nullifiers: None,
        }
    }
}

pub struct Node {
    ordering: Arc<OrderingEngine>,
    verifier: ResourceVerifier,
    evaluator: Arc<dyn Evaluator>,
    events: Arc<EventBus>,
}

impl Node {
    /// Open a node on a persistent store at `config.storage`
    ///
    /// Order indices continue after the highest one already in the store.
    pub fn open(config: NodeConfig, evaluator: Arc<dyn Evaluator>) -> Result<Arc<Self>, ExecError> {
        let store = FjallStore::new(config.storage.clone())?;
        Self::with_store(config, Arc::new(store), evaluator)
    }

    /// Build a node over any store
    pub fn with_store(
        config: NodeConfig,
        store: Arc<dyn VersionedStore>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Arc<Self>, ExecError> {
        let mut ordering = OrderingEngine::new(store)?;
        if let Some(timeout) = config.read_timeout {
            ordering = ordering.with_read_timeout(timeout);
        }
        let ordering = Arc::new(ordering);

        Ok(Arc::new(Self {
            verifier: ResourceVerifier::new(ordering.clone(), config.tree),
            ordering,
            evaluator,
            events: Arc::new(EventBus::new()),
        }))
    }

    pub fn ordering(&self) -> &Arc<OrderingEngine> {
        &self.ordering
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Run `program` for `id` on the runtime
    ///
    /// The id is ordered separately through [`Node::ordering`]; the pipeline
    /// waits for its assignment where it needs it.
    pub fn execute(
        self: &Arc<Self>,
        backend: Backend,
        program: impl Into<Program>,
        id: TransactionId,
    ) -> JoinHandle<Outcome> {
        let node = self.clone();
        let program = program.into();
        tokio::spawn(async move { node.run(backend, program, id).await })
    }

    /// Run the pipeline to completion and return the published outcome
    pub async fn run(&self, backend: Backend, program: Program, id: TransactionId) -> Outcome {
        tracing::debug!("Transaction {} received for {:?}", id, backend);

        let result = match self.process(&backend, program, &id).await {
            Ok(done) => self.commit(&id, done).await,
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(result) => {
                tracing::debug!("Transaction {} completed", id);
                Outcome::Success(result)
            }
            Err(e) => {
                tracing::warn!("Transaction {} failed: {}", id, e);
                Outcome::Failure(e.to_string())
            }
        };

        self.events.publish(CompleteEvent {
            id,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Decode, evaluate and post-process, without writing
    async fn process(
        &self,
        backend: &Backend,
        program: Program,
        id: &TransactionId,
    ) -> Result<Completion, ExecError> {
        let program = match program {
            Program::Encoded(bytes) => match Term::decode(&bytes) {
                Ok(term) => term,
                Err(e) => return Err(self.abandon(id, e.into()).await),
            },
            Program::Decoded(term) => term,
        };
        tracing::debug!("Transaction {} decoded", id);

        let scry = Scry::new(id.clone(), self.ordering.clone());
        let vm_result = self.evaluator.evaluate(program, &scry).await;
        self.events.publish(ResultEvent {
            id: id.clone(),
            vm_result: Outcome::from(vm_result.clone()),
        });

        let result = match vm_result {
            Ok(term) => term,
            Err(reason) => return Err(self.abandon(id, ExecError::Vm(reason)).await),
        };
        tracing::debug!("Transaction {} evaluated", id);

        match self.post_process(backend, id, result).await {
            Ok(done) => {
                tracing::debug!("Transaction {} post-processed", id);
                Ok(done)
            }
            Err(e) => Err(self.abandon(id, e).await),
        }
    }

    async fn post_process(
        &self,
        backend: &Backend,
        id: &TransactionId,
        result: Term,
    ) -> Result<Completion, ExecError> {
        match backend {
            Backend::ReadOnly { reply_to } => {
                if reply_to.send((id.clone(), result.clone())).is_err() {
                    tracing::debug!("Reply receiver for {} is gone", id);
                }
                Ok(Completion::new(Effects::none(), result))
            }
            Backend::KeyValue => {
                let pairs = key_value_pairs(&result)?;
                Ok(Completion::new(Effects::writes(pairs), result))
            }
            Backend::Blob => {
                let encoded = result
                    .encode()
                    .map_err(|e| ExecError::MalformedResult(e.to_string()))?;
                let digest: [u8; 32] = Sha256::digest(&encoded).into();
                if is_reserved(&digest) {
                    return Err(ExecError::ReservedKey(digest.to_vec()));
                }
                tracing::debug!("Transaction {} stores blob {}", id, hex::encode(digest));
                Ok(Completion::new(
                    Effects::none().with_write(digest.to_vec(), result),
                    Term::atom(digest.to_vec()),
                ))
            }
            Backend::ResourceMachine => {
                let transaction = Transaction::from_term(&result)
                    .map_err(|e| ExecError::MalformedResult(e.to_string()))?;
                let verified = self.verifier.verify(id, transaction).await?;
                Ok(Completion {
                    effects: verified.effects,
                    result: verified.transaction.to_term(),
                    nullifiers: Some(verified.nullifiers.iter().map(Nullifier::to_term).collect()),
                })
            }
        }
    }

    /// Write the completion's effects, then announce its nullifiers
    async fn commit(&self, id: &TransactionId, done: Completion) -> Result<Term, ExecError> {
        if let Err(e) = self.ordering.add(id, done.effects).await {
            self.ordering.discard(id);
            return Err(e.into());
        }
        if let Some(nullifiers) = done.nullifiers {
            self.events.publish(NullifierEvent {
                id: id.clone(),
                nullifiers,
            });
        }
        Ok(done.result)
    }

    /// Write empty effects so later transactions are not blocked, and hand
    /// the error back
    async fn abandon(&self, id: &TransactionId, error: ExecError) -> ExecError {
        if let Err(e) = self.ordering.write(id, Vec::new()).await {
            tracing::error!("Failed to write empty effects for {}: {}", id, e);
            self.ordering.discard(id);
        }
        error
    }
}

/// A key-value result: a list of `[key value]` pairs with atom keys outside
/// the reserved prefix
fn key_value_pairs(result: &Term) -> Result<Vec<(Vec<u8>, Term)>, ExecError> {
    let items = result.as_list().ok_or_else(|| {
        ExecError::MalformedResult(format!("expected a list of [key value] pairs, got {}", result))
    })?;

    items
        .iter()
        .map(|item| match item.as_list() {
            Some([Term::Atom(key), _]) if is_reserved(key) => {
                Err(ExecError::ReservedKey(key.clone()))
            }
            Some([Term::Atom(key), value]) => Ok((key.clone(), value.clone())),
            _ => Err(ExecError::MalformedResult(format!(
                "not a [key value] pair: {}",
                item
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_pairs_shape() {
        let good = Term::List(vec![
            Term::pair(Term::from("a"), Term::from("1")),
            Term::pair(Term::from("b"), Term::nil()),
        ]);
        assert_eq!(
            key_value_pairs(&good).unwrap(),
            vec![
                (b"a".to_vec(), Term::from("1")),
                (b"b".to_vec(), Term::nil()),
            ]
        );
        assert!(key_value_pairs(&Term::nil()).unwrap().is_empty());

        for bad in [
            Term::from("atom"),
            Term::List(vec![Term::from("lonely")]),
            Term::List(vec![Term::List(vec![Term::from("k")])]),
            Term::List(vec![Term::pair(Term::nil(), Term::from("v"))]),
            Term::List(vec![Term::List(vec![
                Term::from("k"),
                Term::from("v"),
                Term::from("extra"),
            ])]),
        ] {
            assert!(matches!(
                key_value_pairs(&bad),
                Err(ExecError::MalformedResult(_))
            ));
        }
    }

    #[test]
    fn test_key_value_pairs_refuse_reserved_keys() {
        let mut key = ordo_store::RESERVED_PREFIX.to_vec();
        key.extend_from_slice(b"nullifiers");
        let result = Term::List(vec![
            Term::pair(Term::from("fine"), Term::nil()),
            Term::pair(Term::atom(key.clone()), Term::Set(Default::default())),
        ]);

        match key_value_pairs(&result) {
            Err(ExecError::ReservedKey(refused)) => assert_eq!(refused, key),
            other => panic!("Expected a reserved key error, got {:?}", other),
        }
    }
}
