//! Transaction execution backends
//!
//! A [`Node`] takes a transaction id, a program and a [`Backend`], evaluates
//! the program with a pluggable [`Evaluator`] against a read view scoped to
//! the id, post-processes the result according to the backend and writes
//! the outcome through the ordering engine at the id's position.

pub mod backend;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod node;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use backend::{Backend, Program, ReplyTo};
pub use config::NodeConfig;
pub use error::ExecError;
pub use evaluator::{Evaluator, Scry};
pub use node::Node;
