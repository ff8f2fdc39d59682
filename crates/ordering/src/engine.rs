//! Order index assignment and read/write brokering
//!
//! Every transaction id gets a slot. Callers that read or write before the id
//! is assigned park a oneshot sender in the slot and are woken by `assign`
//! (or failed by `discard`). Once assigned, a read additionally waits on the
//! write watermark: the highest index `h` such that every index in `1..=h`
//! has written. A read at index `n` proceeds once `h >= n - 1`, so it sees
//! exactly the writes of its predecessors.
//!
//! Once the watermark passes an index its slot is retired: only the id and
//! its index are kept, enough to refuse a second assignment or write.

use crate::error::{OrderingError, Result};
use ordo_common::{Anchor, OrderIndex, Term, TransactionId};
use ordo_store::{Effects, VersionedStore};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

type Waiter = oneshot::Sender<Result<OrderIndex>>;

enum Slot {
    /// Not yet assigned; callers waiting for the index
    Pending(Vec<Waiter>),
    Assigned { index: OrderIndex, written: bool },
    /// Discarded before assignment
    Discarded,
}

struct State {
    slots: HashMap<TransactionId, Slot>,
    /// Assigned ids above the watermark, by index
    by_index: BTreeMap<OrderIndex, TransactionId>,
    /// Ids at or below the watermark
    retired: HashMap<TransactionId, OrderIndex>,
    next_index: OrderIndex,
    /// Written indices above the watermark
    completed: BTreeSet<OrderIndex>,
    applied: OrderIndex,
}

impl State {
    fn starting_after(applied: OrderIndex) -> Self {
        Self {
            slots: HashMap::new(),
            by_index: BTreeMap::new(),
            retired: HashMap::new(),
            next_index: applied + 1,
            completed: BTreeSet::new(),
            applied,
        }
    }

    /// Record `index` as written and advance the watermark over any run of
    /// consecutive written indices. Returns the new watermark if it moved.
    fn complete(&mut self, index: OrderIndex) -> Option<OrderIndex> {
        self.completed.insert(index);
        let before = self.applied;
        while self.completed.remove(&(self.applied + 1)) {
            self.applied += 1;
        }
        if self.applied == before {
            return None;
        }

        let above = self.by_index.split_off(&(self.applied + 1));
        for (index, id) in std::mem::replace(&mut self.by_index, above) {
            self.slots.remove(&id);
            self.retired.insert(id, index);
        }
        Some(self.applied)
    }

    /// Drop waiters whose receivers are gone, and the slot if none remain
    fn forget_closed_waiters(&mut self, id: &TransactionId) {
        if let Some(Slot::Pending(waiters)) = self.slots.get_mut(id) {
            waiters.retain(|waiter| !waiter.is_closed());
            if waiters.is_empty() {
                self.slots.remove(id);
            }
        }
    }
}

/// Assigns order indices and brokers all store access by transaction id
pub struct OrderingEngine {
    store: Arc<dyn VersionedStore>,
    state: Mutex<State>,
    watermark: watch::Sender<OrderIndex>,
    read_timeout: Option<Duration>,
}

impl OrderingEngine {
    /// Order transactions over `store`, continuing after its last applied index
    pub fn new(store: Arc<dyn VersionedStore>) -> Result<Self> {
        let applied = store.last_index()?;
        let (watermark, _) = watch::channel(applied);
        if applied > 0 {
            tracing::info!("Resuming order after index {}", applied);
        }

        Ok(Self {
            store,
            state: Mutex::new(State::starting_after(applied)),
            watermark,
            read_timeout: None,
        })
    }

    /// Bound how long a read (or write) may wait for its turn
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &Arc<dyn VersionedStore> {
        &self.store
    }

    /// Largest `h` such that every index in `1..=h` has written
    pub fn applied_height(&self) -> OrderIndex {
        *self.watermark.borrow()
    }

    /// Index assigned to `id`, without waiting
    pub fn index_of(&self, id: &TransactionId) -> Option<OrderIndex> {
        let state = self.state.lock();
        match state.slots.get(id) {
            Some(Slot::Assigned { index, .. }) => Some(*index),
            _ => state.retired.get(id).copied(),
        }
    }

    /// Give `id` the next position in the total order
    pub fn assign(&self, id: TransactionId) -> Result<OrderIndex> {
        let (index, finished) = {
            let mut state = self.state.lock();
            let index = state.next_index;
            if state.retired.contains_key(&id) {
                return Err(OrderingError::DuplicateAssignment(id));
            }

            let previous = state.slots.remove(&id);
            let (slot, finished) = match previous {
                Some(slot @ Slot::Assigned { .. }) => {
                    state.slots.insert(id.clone(), slot);
                    return Err(OrderingError::DuplicateAssignment(id));
                }
                Some(Slot::Pending(waiters)) => {
                    for waiter in waiters {
                        let _ = waiter.send(Ok(index));
                    }
                    (Slot::Assigned { index, written: false }, false)
                }
                // Nobody will ever write for a discarded id, so it is written empty now
                Some(Slot::Discarded) => (Slot::Assigned { index, written: true }, true),
                None => (Slot::Assigned { index, written: false }, false),
            };

            state.next_index += 1;
            state.slots.insert(id.clone(), slot);
            state.by_index.insert(index, id.clone());
            let moved = if finished { state.complete(index) } else { None };
            (index, moved)
        };

        if let Some(height) = finished {
            self.watermark.send_replace(height);
        }

        tracing::debug!("Assigned index {} to transaction {}", index, id);
        Ok(index)
    }

    /// Assign consecutive indices to `ids`, in order
    pub fn assign_batch(&self, ids: Vec<TransactionId>) -> Result<Vec<OrderIndex>> {
        ids.into_iter().map(|id| self.assign(id)).collect()
    }

    /// Latest value of `key` written at or before `id`'s index
    pub async fn read(&self, id: &TransactionId, key: &[u8]) -> Result<Option<Term>> {
        let index = self.wait_readable(id).await?;
        Ok(self.store.get(key, index)?)
    }

    /// Value of `key` as of an earlier `height`, which must not exceed `id`'s index
    pub async fn read_at(
        &self,
        id: &TransactionId,
        key: &[u8],
        height: OrderIndex,
    ) -> Result<Option<Term>> {
        let index = self.wait_readable(id).await?;
        if height > index {
            return Err(OrderingError::FutureRead {
                id: id.clone(),
                index,
                height,
            });
        }
        Ok(self.store.get(key, height)?)
    }

    /// All keys under `prefix` as of `id`'s index
    pub async fn read_prefix(
        &self,
        id: &TransactionId,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Term)>> {
        let index = self.wait_readable(id).await?;
        Ok(self.store.scan_prefix(prefix, index)?)
    }

    /// Highest index at or before `id`'s at which `anchor` was recorded
    pub async fn root_height(
        &self,
        id: &TransactionId,
        anchor: &Anchor,
    ) -> Result<Option<OrderIndex>> {
        let index = self.wait_readable(id).await?;
        Ok(self.store.root_height(anchor, index)?)
    }

    /// Overwrite `pairs` at `id`'s index
    pub async fn write(&self, id: &TransactionId, pairs: Vec<(Vec<u8>, Term)>) -> Result<()> {
        self.add(id, Effects::writes(pairs)).await
    }

    /// Apply `effects` atomically at `id`'s index
    ///
    /// Waits for `id` to be assigned. Effects with set appends also wait for
    /// every earlier index to write, since the union is taken over the stored
    /// set as of this index.
    pub async fn add(&self, id: &TransactionId, effects: Effects) -> Result<()> {
        let index = self
            .bounded(id, self.wait_writable(id, !effects.append.is_empty()))
            .await?;

        self.claim_write(id)?;

        let result = if effects.is_empty() {
            Ok(())
        } else {
            self.store.apply(index, &effects)
        };

        // Later readers must not block on a failed write
        self.mark_written(index);

        if let Err(e) = result {
            tracing::error!("Failed to apply effects for {} at {}: {}", id, index, e);
            return Err(e.into());
        }

        tracing::debug!("Transaction {} wrote at index {}", id, index);
        Ok(())
    }

    /// Give up on `id`
    ///
    /// Waiters for an unassigned id fail with `Unassigned`. An assigned id that
    /// has not written gets an empty write so it never blocks later readers.
    pub fn discard(&self, id: &TransactionId) {
        let moved = {
            let mut state = self.state.lock();
            if state.retired.contains_key(id) {
                return;
            }
            match state.slots.remove(id) {
                None => {
                    state.slots.insert(id.clone(), Slot::Discarded);
                    None
                }
                Some(Slot::Pending(waiters)) => {
                    for waiter in waiters {
                        let _ = waiter.send(Err(OrderingError::Unassigned(id.clone())));
                    }
                    state.slots.insert(id.clone(), Slot::Discarded);
                    None
                }
                Some(Slot::Assigned {
                    index,
                    written: false,
                }) => {
                    state.slots.insert(
                        id.clone(),
                        Slot::Assigned {
                            index,
                            written: true,
                        },
                    );
                    state.complete(index)
                }
                Some(slot) => {
                    state.slots.insert(id.clone(), slot);
                    None
                }
            }
        };

        if let Some(height) = moved {
            self.watermark.send_replace(height);
        }
        tracing::debug!("Discarded transaction {}", id);
    }

    async fn wait_readable(&self, id: &TransactionId) -> Result<OrderIndex> {
        self.bounded(id, self.wait_writable(id, true)).await
    }

    async fn wait_writable(&self, id: &TransactionId, needs_turn: bool) -> Result<OrderIndex> {
        let index = self.wait_assigned(id).await?;
        if needs_turn {
            self.wait_turn(index).await?;
        }
        Ok(index)
    }

    async fn bounded<F>(&self, id: &TransactionId, wait: F) -> Result<OrderIndex>
    where
        F: Future<Output = Result<OrderIndex>>,
    {
        let Some(limit) = self.read_timeout else {
            return wait.await;
        };

        let waited = tokio::time::timeout(limit, wait).await;
        match waited {
            Ok(result) => result,
            Err(_) => {
                self.state.lock().forget_closed_waiters(id);
                Err(OrderingError::Timeout(id.clone()))
            }
        }
    }

    async fn wait_assigned(&self, id: &TransactionId) -> Result<OrderIndex> {
        let rx = {
            let mut state = self.state.lock();
            if let Some(index) = state.retired.get(id) {
                return Ok(*index);
            }
            match state.slots.get_mut(id) {
                Some(Slot::Assigned { index, .. }) => return Ok(*index),
                Some(Slot::Discarded) => return Err(OrderingError::Unassigned(id.clone())),
                Some(Slot::Pending(waiters)) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    rx
                }
                None => {
                    let (tx, rx) = oneshot::channel();
                    state.slots.insert(id.clone(), Slot::Pending(vec![tx]));
                    rx
                }
            }
        };

        rx.await
            .map_err(|_| OrderingError::Unassigned(id.clone()))?
    }

    /// Wait until every index before `index` has written
    async fn wait_turn(&self, index: OrderIndex) -> Result<()> {
        let mut rx = self.watermark.subscribe();
        rx.wait_for(|applied| applied + 1 >= index)
            .await
            .map_err(|_| OrderingError::Closed)?;
        Ok(())
    }

    fn claim_write(&self, id: &TransactionId) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.slots.get_mut(id) {
            Some(Slot::Assigned { written, .. }) if !*written => {
                *written = true;
                Ok(())
            }
            Some(Slot::Assigned { .. }) => Err(OrderingError::DuplicateWrite(id.clone())),
            _ if state.retired.contains_key(id) => Err(OrderingError::DuplicateWrite(id.clone())),
            _ => Err(OrderingError::Unassigned(id.clone())),
        }
    }

    fn mark_written(&self, index: OrderIndex) {
        let moved = self.state.lock().complete(index);
        if let Some(height) = moved {
            self.watermark.send_replace(height);
        }
    }
}
