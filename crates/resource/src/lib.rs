//! Transparent resource machine
//!
//! Resources are created by publishing a commitment and consumed by
//! publishing a nullifier. This crate provides:
//! - [`Resource`] and its [`Commitment`] / [`Nullifier`] labels
//! - [`Transaction`]s made of [`Action`]s, with their term form
//! - the append-only [`CommitmentTree`] whose roots anchor spends
//! - the [`ResourceVerifier`], which rejects double spends, duplicate
//!   commitments and spends of resources not committed at a declared root

pub mod error;
pub mod resource;
pub mod transaction;
pub mod tree;
pub mod verifier;

pub use error::{ParseError, TreeError, VerifyError};
pub use resource::{Commitment, Nullifier, Resource};
pub use transaction::{Action, Transaction};
pub use tree::{CommitmentTree, TreeSpec};
pub use verifier::{ResourceVerifier, Verified};
