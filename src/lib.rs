//! Ordo: ordering, execution backends and resource verification
//!
//! This crate re-exports the workspace crates:
//! - [`common`]: ids, order indices, terms, outcomes, anchors
//! - [`store`]: versioned storage (Fjall-backed and in-memory)
//! - [`ordering`]: the ordering engine that serializes reads and writes
//! - [`resource`]: resources, the commitment tree and the verifier
//! - [`events`]: transaction events and the event bus
//! - [`executor`]: backends, the evaluator interface and the node pipeline

pub use ordo_common as common;
pub use ordo_events as events;
pub use ordo_executor as executor;
pub use ordo_ordering as ordering;
pub use ordo_resource as resource;
pub use ordo_store as store;

pub use ordo_common::{Anchor, OrderIndex, Outcome, Term, TransactionId};
pub use ordo_events::{Event, EventBus, EventKind};
pub use ordo_executor::{Backend, Evaluator, ExecError, Node, NodeConfig, Program, Scry};
pub use ordo_ordering::{OrderingEngine, OrderingError};
pub use ordo_resource::{Action, Resource, Transaction, TreeSpec};
pub use ordo_store::{Effects, FjallStore, MemoryStore, StorageConfig, VersionedStore};
