//! Integration tests for the ordering engine

use ordo_common::{Anchor, Term, TransactionId};
use ordo_ordering::{OrderingEngine, OrderingError};
use ordo_store::{Effects, FjallStore, MemoryStore, StorageConfig};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn memory_engine() -> Arc<OrderingEngine> {
    Arc::new(OrderingEngine::new(Arc::new(MemoryStore::new())).unwrap())
}

fn id(name: &str) -> TransactionId {
    TransactionId::from(name)
}

// ============================================================================
// Read visibility
// ============================================================================

#[tokio::test]
async fn test_reads_see_exactly_the_writes_ordered_before() {
    let engine = memory_engine();
    let (t1, t2, t3) = (id("t1"), id("t2"), id("t3"));
    engine
        .assign_batch(vec![t1.clone(), t2.clone(), t3.clone()])
        .unwrap();

    // t3 writes first; t2 must not see it
    engine
        .write(&t3, vec![(b"k".to_vec(), Term::from("from-t3"))])
        .await
        .unwrap();
    engine
        .write(&t1, vec![(b"k".to_vec(), Term::from("from-t1"))])
        .await
        .unwrap();

    assert_eq!(
        engine.read(&t2, b"k").await.unwrap(),
        Some(Term::from("from-t1"))
    );

    engine.write(&t2, vec![]).await.unwrap();
    assert_eq!(engine.applied_height(), 3);
    assert_eq!(
        engine.read(&t3, b"k").await.unwrap(),
        Some(Term::from("from-t3"))
    );
}

#[tokio::test]
async fn test_read_blocks_until_predecessor_writes() {
    let engine = memory_engine();
    let (t1, t2) = (id("t1"), id("t2"));
    engine.assign_batch(vec![t1.clone(), t2.clone()]).unwrap();

    let reader = {
        let engine = engine.clone();
        let t2 = t2.clone();
        tokio::spawn(async move { engine.read(&t2, b"k").await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    engine
        .write(&t1, vec![(b"k".to_vec(), Term::from("v"))])
        .await
        .unwrap();

    let value = reader.await.unwrap().unwrap();
    assert_eq!(value, Some(Term::from("v")));
}

#[tokio::test]
async fn test_read_before_assignment_waits_for_assign() {
    let engine = memory_engine();
    let t1 = id("t1");

    let reader = {
        let engine = engine.clone();
        let t1 = t1.clone();
        tokio::spawn(async move { engine.read(&t1, b"k").await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    engine.assign(t1).unwrap();
    assert_eq!(reader.await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn test_write_does_not_wait_for_predecessors() {
    let engine = memory_engine();
    let (t1, t2) = (id("t1"), id("t2"));
    engine.assign_batch(vec![t1.clone(), t2.clone()]).unwrap();

    // t1 never wrote, yet t2's plain write goes through
    tokio::time::timeout(
        Duration::from_secs(1),
        engine.write(&t2, vec![(b"k".to_vec(), Term::from("v"))]),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(engine.applied_height(), 0);
}

// ============================================================================
// Effects
// ============================================================================

#[tokio::test]
async fn test_add_unions_sets_and_records_anchor() {
    let engine = memory_engine();
    let (t1, t2, t3) = (id("t1"), id("t2"), id("t3"));
    engine
        .assign_batch(vec![t1.clone(), t2.clone(), t3.clone()])
        .unwrap();

    let anchor = Anchor::from_bytes([4u8; 32]);
    let first: BTreeSet<Term> = [Term::from("NF_a")].into_iter().collect();
    let second: BTreeSet<Term> = [Term::from("NF_b")].into_iter().collect();

    engine
        .add(
            &t1,
            Effects::none()
                .with_append(b"nullifiers".to_vec(), first)
                .with_anchor(anchor),
        )
        .await
        .unwrap();
    engine
        .add(&t2, Effects::none().with_append(b"nullifiers".to_vec(), second))
        .await
        .unwrap();

    let expected: BTreeSet<Term> = [Term::from("NF_a"), Term::from("NF_b")]
        .into_iter()
        .collect();
    assert_eq!(
        engine.read(&t3, b"nullifiers").await.unwrap(),
        Some(Term::Set(expected))
    );
    assert_eq!(engine.root_height(&t3, &anchor).await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_read_at_and_future_read() {
    let engine = memory_engine();
    let (t1, t2, t3) = (id("t1"), id("t2"), id("t3"));
    engine
        .assign_batch(vec![t1.clone(), t2.clone(), t3.clone()])
        .unwrap();

    engine
        .write(&t1, vec![(b"k".to_vec(), Term::from("old"))])
        .await
        .unwrap();
    engine
        .write(&t2, vec![(b"k".to_vec(), Term::from("new"))])
        .await
        .unwrap();

    assert_eq!(
        engine.read_at(&t3, b"k", 1).await.unwrap(),
        Some(Term::from("old"))
    );
    assert!(matches!(
        engine.read_at(&t3, b"k", 4).await,
        Err(OrderingError::FutureRead { height: 4, index: 3, .. })
    ));
}

#[tokio::test]
async fn test_read_prefix_respects_order() {
    let engine = memory_engine();
    let (t1, t2, t3) = (id("t1"), id("t2"), id("t3"));
    engine
        .assign_batch(vec![t1.clone(), t2.clone(), t3.clone()])
        .unwrap();

    engine
        .write(&t1, vec![(b"acct/alice".to_vec(), Term::from("1"))])
        .await
        .unwrap();
    engine
        .write(&t3, vec![(b"acct/bob".to_vec(), Term::from("2"))])
        .await
        .unwrap();
    engine.write(&t2, vec![]).await.unwrap();

    let at_t2 = engine.read_prefix(&t2, b"acct/").await.unwrap();
    assert_eq!(at_t2, vec![(b"acct/alice".to_vec(), Term::from("1"))]);
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_each_id_writes_once() {
    let engine = memory_engine();
    let t1 = id("t1");
    engine.assign(t1.clone()).unwrap();

    engine.write(&t1, vec![]).await.unwrap();
    assert!(matches!(
        engine.write(&t1, vec![]).await,
        Err(OrderingError::DuplicateWrite(_))
    ));
}

#[tokio::test]
async fn test_discard_fails_pending_waiters() {
    let engine = memory_engine();
    let ghost = id("ghost");

    let reader = {
        let engine = engine.clone();
        let ghost = ghost.clone();
        tokio::spawn(async move { engine.read(&ghost, b"k").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    engine.discard(&ghost);
    assert!(matches!(
        reader.await.unwrap(),
        Err(OrderingError::Unassigned(_))
    ));
    assert!(matches!(
        engine.write(&ghost, vec![]).await,
        Err(OrderingError::Unassigned(_))
    ));
}

#[tokio::test]
async fn test_read_timeout() {
    let engine = OrderingEngine::new(Arc::new(MemoryStore::new()))
        .unwrap()
        .with_read_timeout(Duration::from_millis(30));
    let (t1, t2) = (id("t1"), id("t2"));
    engine.assign_batch(vec![t1, t2.clone()]).unwrap();

    assert!(matches!(
        engine.read(&t2, b"k").await,
        Err(OrderingError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_failed_apply_still_advances_watermark() {
    let engine = memory_engine();
    let (t1, t2, t3) = (id("t1"), id("t2"), id("t3"));
    engine
        .assign_batch(vec![t1.clone(), t2.clone(), t3.clone()])
        .unwrap();

    engine
        .write(&t1, vec![(b"scalar".to_vec(), Term::from("x"))])
        .await
        .unwrap();

    let not_a_set: BTreeSet<Term> = [Term::from("y")].into_iter().collect();
    let err = engine
        .add(&t2, Effects::none().with_append(b"scalar".to_vec(), not_a_set))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderingError::Store(_)));

    assert_eq!(engine.applied_height(), 2);
    assert_eq!(
        engine.read(&t3, b"scalar").await.unwrap(),
        Some(Term::from("x"))
    );
}

// ============================================================================
// Persistent store
// ============================================================================

#[tokio::test]
async fn test_ordering_over_fjall_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = FjallStore::new(StorageConfig::new(temp_dir.path().to_path_buf())).unwrap();
    let engine = Arc::new(OrderingEngine::new(Arc::new(store)).unwrap());

    let ids: Vec<TransactionId> = (0..8).map(|n| id(&format!("tx-{n}"))).collect();
    engine.assign_batch(ids.clone()).unwrap();

    // Write in reverse order from separate tasks
    let mut handles = Vec::new();
    for (n, tx) in ids.iter().enumerate().rev() {
        let engine = engine.clone();
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            engine
                .write(&tx, vec![(b"last".to_vec(), Term::from(format!("{n}").as_str()))])
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(engine.applied_height(), 8);
    let reader = id("reader");
    engine.assign(reader.clone()).unwrap();
    assert_eq!(
        engine.read(&reader, b"last").await.unwrap(),
        Some(Term::from("7"))
    );
}
