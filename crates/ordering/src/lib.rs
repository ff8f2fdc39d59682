//! Total ordering of transactions over a versioned store
//!
//! The [`OrderingEngine`] assigns each transaction id a strictly increasing
//! [`OrderIndex`](ordo_common::OrderIndex) and is the only path to the store
//! for executing transactions. Reads by a transaction see exactly the writes
//! of transactions ordered before it; writes are applied at the
//! transaction's own index, once.

pub mod engine;
pub mod error;

pub use engine::OrderingEngine;
pub use error::{OrderingError, Result};
