use ordo_common::{Outcome, Term, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw outcome of evaluating a transaction's program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEvent {
    pub id: TransactionId,
    pub vm_result: Outcome,
}

/// Terminal outcome of a transaction, after backend post-processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteEvent {
    pub id: TransactionId,
    pub outcome: Outcome,
}

/// Nullifiers consumed by an accepted resource transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierEvent {
    pub id: TransactionId,
    pub nullifiers: BTreeSet<Term>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Result,
    Complete,
    Nullifiers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Result(ResultEvent),
    Complete(CompleteEvent),
    Nullifiers(NullifierEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Result(_) => EventKind::Result,
            Event::Complete(_) => EventKind::Complete,
            Event::Nullifiers(_) => EventKind::Nullifiers,
        }
    }

    pub fn id(&self) -> &TransactionId {
        match self {
            Event::Result(e) => &e.id,
            Event::Complete(e) => &e.id,
            Event::Nullifiers(e) => &e.id,
        }
    }

    /// JSON rendering for external observers
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl From<ResultEvent> for Event {
    fn from(event: ResultEvent) -> Self {
        Event::Result(event)
    }
}

impl From<CompleteEvent> for Event {
    fn from(event: CompleteEvent) -> Self {
        Event::Complete(event)
    }
}

impl From<NullifierEvent> for Event {
    fn from(event: NullifierEvent) -> Self {
        Event::Nullifiers(event)
    }
}
