//! Resource machine transactions and their term form
//!
//! Term layout:
//! ```text
//! [ {root ...} [ [{commitment ...} {nullifier ...}] ... ] ]
//! ```
//! Roots are 32-byte atoms; commitments and nullifiers are label atoms.

use crate::error::ParseError;
use crate::resource::{Commitment, Nullifier, Resource};
use ordo_common::{Anchor, Term};
use std::collections::BTreeSet;

/// Commitments created and nullifiers consumed by one atomic step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub commitments: BTreeSet<Commitment>,
    pub nullifiers: BTreeSet<Nullifier>,
}

impl Action {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(mut self, resource: &Resource) -> Result<Self, ParseError> {
        self.commitments.insert(resource.commitment()?);
        Ok(self)
    }

    pub fn consume(mut self, resource: &Resource) -> Result<Self, ParseError> {
        self.nullifiers.insert(resource.nullifier()?);
        Ok(self)
    }

    fn to_term(&self) -> Term {
        Term::pair(
            Term::Set(self.commitments.iter().map(Commitment::to_term).collect()),
            Term::Set(self.nullifiers.iter().map(Nullifier::to_term).collect()),
        )
    }

    fn from_term(term: &Term) -> Result<Self, ParseError> {
        let [commitments, nullifiers] = fields::<2>(term, "action")?;
        Ok(Self {
            commitments: labels(commitments, "commitments", Commitment::from_bytes)?,
            nullifiers: labels(nullifiers, "nullifiers", Nullifier::from_bytes)?,
        })
    }
}

/// A set of actions plus the roots it claims validity against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub roots: BTreeSet<Anchor>,
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: Anchor) -> Self {
        self.roots.insert(root);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Union of all actions' commitments
    pub fn commitments(&self) -> BTreeSet<Commitment> {
        self.actions
            .iter()
            .flat_map(|action| action.commitments.iter().cloned())
            .collect()
    }

    /// Union of all actions' nullifiers
    pub fn nullifiers(&self) -> BTreeSet<Nullifier> {
        self.actions
            .iter()
            .flat_map(|action| action.nullifiers.iter().cloned())
            .collect()
    }

    pub fn to_term(&self) -> Term {
        Term::pair(
            Term::atom_set(self.roots.iter().map(|root| root.as_bytes().to_vec())),
            Term::List(self.actions.iter().map(Action::to_term).collect()),
        )
    }

    pub fn from_term(term: &Term) -> Result<Self, ParseError> {
        let [roots, actions] = fields::<2>(term, "transaction")?;

        let roots = labels(roots, "roots", |bytes| {
            Anchor::from_slice(&bytes).ok_or_else(|| {
                ParseError::Shape(format!("root must be {} bytes, got {}", Anchor::LEN, bytes.len()))
            })
        })?;

        let actions = actions
            .elements()
            .ok_or_else(|| ParseError::Shape("actions must be a list".to_string()))?
            .into_iter()
            .map(Action::from_term)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { roots, actions })
    }
}

/// Exactly `N` elements of a list or set
fn fields<'a, const N: usize>(term: &'a Term, what: &str) -> Result<[&'a Term; N], ParseError> {
    let elements = term
        .elements()
        .ok_or_else(|| ParseError::Shape(format!("{} must be a list", what)))?;
    let count = elements.len();
    elements
        .try_into()
        .map_err(|_| ParseError::Shape(format!("{} must have {} fields, got {}", what, N, count)))
}

/// A list or set of atoms, each converted by `parse`
fn labels<T, F>(term: &Term, what: &str, mut parse: F) -> Result<BTreeSet<T>, ParseError>
where
    T: Ord,
    F: FnMut(Vec<u8>) -> Result<T, ParseError>,
{
    term.elements()
        .ok_or_else(|| ParseError::Shape(format!("{} must be a set", what)))?
        .into_iter()
        .map(|element| match element.as_atom() {
            Some(bytes) => parse(bytes.to_vec()),
            None => Err(ParseError::Shape(format!("{} must contain atoms", what))),
        })
        .collect()
}
