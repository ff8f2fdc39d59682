//! Integration tests for resource verification over the ordering engine

use ordo_common::{Anchor, Term, TransactionId};
use ordo_ordering::OrderingEngine;
use ordo_resource::verifier::{ANCHOR_KEY, COMMITMENTS_KEY, NULLIFIERS_KEY};
use ordo_resource::{
    Action, CommitmentTree, Resource, ResourceVerifier, Transaction, TreeSpec, VerifyError,
};
use ordo_store::MemoryStore;
use std::sync::Arc;

struct Harness {
    ordering: Arc<OrderingEngine>,
    verifier: ResourceVerifier,
}

impl Harness {
    fn new() -> Self {
        let ordering = Arc::new(OrderingEngine::new(Arc::new(MemoryStore::new())).unwrap());
        let verifier = ResourceVerifier::new(ordering.clone(), TreeSpec::default());
        Self { ordering, verifier }
    }

    /// Assign, verify and write like the resource machine backend does
    async fn submit(&self, name: &str, tx: Transaction) -> Result<(), VerifyError> {
        let id = TransactionId::from(name);
        self.ordering.assign(id.clone()).unwrap();
        match self.verifier.verify(&id, tx).await {
            Ok(verified) => {
                self.ordering.add(&id, verified.effects).await.unwrap();
                Ok(())
            }
            Err(e) => {
                self.ordering.write(&id, vec![]).await.unwrap();
                Err(e)
            }
        }
    }

    async fn read(&self, key: &[u8]) -> Option<Term> {
        let reader = TransactionId::generate();
        self.ordering.assign(reader.clone()).unwrap();
        let value = self.ordering.read(&reader, key).await.unwrap();
        self.ordering.write(&reader, vec![]).await.unwrap();
        value
    }

    /// The anchor as of everything submitted so far
    async fn root(&self) -> Anchor {
        match self.read(ANCHOR_KEY).await {
            Some(Term::Atom(bytes)) => Anchor::from_slice(&bytes).unwrap(),
            other => panic!("expected anchor atom, got {:?}", other),
        }
    }
}

fn coin(n: u8) -> Resource {
    Resource::new([n; 32], [0u8; 32], n as u64).with_nonce([n; 32])
}

fn create(resources: &[Resource]) -> Transaction {
    let action = resources
        .iter()
        .fold(Action::new(), |action, r| action.create(r).unwrap());
    Transaction::new().with_action(action)
}

#[tokio::test]
async fn test_creation_updates_sets_and_anchor() {
    let h = Harness::new();
    h.submit("t2", create(&[coin(1)])).await.unwrap();

    let cm = coin(1).commitment().unwrap();
    let commitments = h.read(COMMITMENTS_KEY).await.unwrap();
    assert!(commitments.as_set().unwrap().contains(&cm.to_term()));

    let expected = CommitmentTree::new(TreeSpec::default())
        .unwrap()
        .add(&[cm].into_iter().collect())
        .unwrap()
        .1;
    assert_eq!(
        h.read(ANCHOR_KEY).await,
        Some(Term::atom(expected.as_bytes().to_vec()))
    );
}

#[tokio::test]
async fn test_duplicate_commitment_changes_nothing() {
    let h = Harness::new();
    h.submit("t2", create(&[coin(1)])).await.unwrap();
    let anchor_before = h.read(ANCHOR_KEY).await;

    let err = h.submit("t3", create(&[coin(1)])).await.unwrap_err();
    assert!(matches!(err, VerifyError::DuplicateCommitment(_)));
    assert_eq!(h.read(ANCHOR_KEY).await, anchor_before);
}

#[tokio::test]
async fn test_spend_against_recorded_root() {
    let h = Harness::new();
    h.submit("create", create(&[coin(1)])).await.unwrap();

    let root = match h.read(ANCHOR_KEY).await {
        Some(Term::Atom(bytes)) => ordo_common::Anchor::from_slice(&bytes).unwrap(),
        other => panic!("expected anchor atom, got {:?}", other),
    };

    let spend = Transaction::new()
        .with_root(root)
        .with_action(Action::new().consume(&coin(1)).unwrap());
    h.submit("spend", spend.clone()).await.unwrap();

    let nullifiers = h.read(NULLIFIERS_KEY).await.unwrap();
    assert!(nullifiers
        .as_set()
        .unwrap()
        .contains(&coin(1).nullifier().unwrap().to_term()));

    // The same spend again is a double spend
    let err = h.submit("again", spend).await.unwrap_err();
    assert!(matches!(err, VerifyError::DoubleSpend(_)));
}

#[tokio::test]
async fn test_resubmitted_nullifier_is_rejected_without_mutation() {
    let h = Harness::new();
    let eph = coin(9).ephemeral();
    let spend = Transaction::new().with_action(Action::new().consume(&eph).unwrap());

    h.submit("first", spend.clone()).await.unwrap();
    let nullifiers_before = h.read(NULLIFIERS_KEY).await;
    let anchor_before = h.read(ANCHOR_KEY).await;

    // Bundled with a fresh commitment, still rejected as a whole
    let resubmit = spend.with_action(Action::new().create(&coin(2)).unwrap());
    let err = h.submit("second", resubmit).await.unwrap_err();
    assert!(matches!(err, VerifyError::DoubleSpend(_)));

    assert_eq!(h.read(NULLIFIERS_KEY).await, nullifiers_before);
    assert_eq!(h.read(ANCHOR_KEY).await, anchor_before);
}

fn ephemeral_spend(a: u8, b: u8) -> Transaction {
    Transaction::new().with_action(
        Action::new()
            .consume(&coin(a).ephemeral())
            .unwrap()
            .consume(&coin(b).ephemeral())
            .unwrap(),
    )
}

#[tokio::test]
async fn test_ephemeral_only_spend_needs_no_root() {
    let h = Harness::new();
    h.submit("eph", ephemeral_spend(3, 4)).await.unwrap();

    // Still true once the tree holds commitments
    h.submit("create", create(&[coin(1), coin(2)])).await.unwrap();
    h.submit("eph-later", ephemeral_spend(5, 6)).await.unwrap();
}

#[tokio::test]
async fn test_highest_declared_root_wins() {
    let h = Harness::new();
    h.submit("first", create(&[coin(1)])).await.unwrap();
    let older = h.root().await;
    h.submit("second", create(&[coin(2)])).await.unwrap();
    let newer = h.root().await;

    // coin 2 exists only under the newer root
    let spend = Transaction::new()
        .with_root(older)
        .with_root(newer)
        .with_action(Action::new().consume(&coin(2)).unwrap());
    h.submit("spend", spend).await.unwrap();
}

#[tokio::test]
async fn test_unrecorded_root_does_not_count() {
    let h = Harness::new();
    h.submit("first", create(&[coin(1)])).await.unwrap();
    let older = h.root().await;
    h.submit("second", create(&[coin(2)])).await.unwrap();

    let unknown = Anchor::from_bytes([0xab; 32]);
    let spend = Transaction::new()
        .with_root(unknown)
        .with_root(older)
        .with_action(Action::new().consume(&coin(2)).unwrap());
    let err = h.submit("spend", spend).await.unwrap_err();
    assert!(matches!(err, VerifyError::StaleOrInvalidRoot(_)));
}

#[tokio::test]
async fn test_non_ephemeral_spend_without_root_is_stale() {
    let h = Harness::new();
    h.submit("create", create(&[coin(1)])).await.unwrap();

    let spend = Transaction::new().with_action(Action::new().consume(&coin(1)).unwrap());
    let err = h.submit("spend", spend).await.unwrap_err();
    assert!(matches!(err, VerifyError::StaleOrInvalidRoot(_)));
}

#[tokio::test]
async fn test_spend_of_resource_committed_after_root_is_stale() {
    let h = Harness::new();
    h.submit("first", create(&[coin(1)])).await.unwrap();
    let old_root = match h.read(ANCHOR_KEY).await {
        Some(Term::Atom(bytes)) => ordo_common::Anchor::from_slice(&bytes).unwrap(),
        other => panic!("expected anchor atom, got {:?}", other),
    };
    h.submit("second", create(&[coin(2)])).await.unwrap();

    // coin 2 was committed after old_root
    let spend = Transaction::new()
        .with_root(old_root)
        .with_action(Action::new().consume(&coin(2)).unwrap());
    let err = h.submit("spend", spend).await.unwrap_err();
    assert!(matches!(err, VerifyError::StaleOrInvalidRoot(_)));
}

#[tokio::test]
async fn test_genesis_root_is_not_recorded() {
    let h = Harness::new();
    let genesis = CommitmentTree::new(TreeSpec::default()).unwrap().anchor();

    let spend = Transaction::new()
        .with_root(genesis)
        .with_action(Action::new().consume(&coin(5)).unwrap());
    let err = h.submit("spend", spend).await.unwrap_err();
    assert!(matches!(err, VerifyError::StaleOrInvalidRoot(_)));
}
