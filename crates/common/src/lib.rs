//! Common types shared by the ordering, execution and verification crates
//!
//! This crate defines:
//! - Transaction ids (opaque bytes, UUIDv7-based when generated locally)
//! - Order indices (positions in the node's total order)
//! - `Term`, the value type produced by program evaluation and kept in storage
//! - `Outcome`, the terminal result of a transaction
//! - `Anchor`, a commitment tree root

mod anchor;
mod outcome;
mod term;
mod transaction_id;

pub use anchor::Anchor;
pub use outcome::Outcome;
pub use term::{Term, TermError};
pub use transaction_id::TransactionId;

/// Position of a transaction in the node's total order.
///
/// The first assigned transaction gets index 1. Index 0 is genesis: nothing
/// has been written at or before it.
pub type OrderIndex = u64;

/// Order index of the empty, pre-transaction state
pub const GENESIS: OrderIndex = 0;
