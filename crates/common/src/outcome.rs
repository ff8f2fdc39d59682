use crate::Term;
use serde::{Deserialize, Serialize};

/// Terminal result of one transaction
///
/// Failures carry a human-readable reason for observability only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success(Term),
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The success payload, if any
    pub fn term(&self) -> Option<&Term> {
        match self {
            Outcome::Success(term) => Some(term),
            Outcome::Failure(_) => None,
        }
    }

    /// The failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(reason) => Some(reason),
        }
    }
}

impl<E: std::fmt::Display> From<Result<Term, E>> for Outcome {
    fn from(result: Result<Term, E>) -> Self {
        match result {
            Ok(term) => Outcome::Success(term),
            Err(e) => Outcome::Failure(e.to_string()),
        }
    }
}
