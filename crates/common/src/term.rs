//! The value type produced by program evaluation
//!
//! Programs, evaluation results and stored values are all `Term`s. The
//! compact (serialized) form of a term is its CBOR encoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Errors converting terms to and from their compact form
#[derive(Debug, Error)]
pub enum TermError {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),
}

/// A value: an atom of bytes, an ordered list, or a set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Atom(Vec<u8>),
    List(Vec<Term>),
    Set(BTreeSet<Term>),
}

impl Term {
    /// Create an atom
    pub fn atom(bytes: impl Into<Vec<u8>>) -> Self {
        Term::Atom(bytes.into())
    }

    /// The empty list
    pub fn nil() -> Self {
        Term::List(Vec::new())
    }

    /// Two-element list, the shape used for key/value pairs
    pub fn pair(first: Term, second: Term) -> Self {
        Term::List(vec![first, second])
    }

    /// Set of atoms
    pub fn atom_set<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Term::Set(items.into_iter().map(|b| Term::Atom(b.into())).collect())
    }

    pub fn as_atom(&self) -> Option<&[u8]> {
        match self {
            Term::Atom(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<Term>> {
        match self {
            Term::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Elements of a list or set, in order
    pub fn elements(&self) -> Option<Vec<&Term>> {
        match self {
            Term::Atom(_) => None,
            Term::List(items) => Some(items.iter().collect()),
            Term::Set(items) => Some(items.iter().collect()),
        }
    }

    /// Encode to the compact CBOR form
    pub fn encode(&self) -> Result<Vec<u8>, TermError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| TermError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from the compact CBOR form
    pub fn decode(bytes: &[u8]) -> Result<Self, TermError> {
        ciborium::from_reader(bytes).map_err(|e| TermError::Decoding(e.to_string()))
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::Atom(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Term {
    fn from(bytes: Vec<u8>) -> Self {
        Term::Atom(bytes)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) if s.chars().all(|c| c.is_ascii_graphic()) => write!(f, "{}", s),
                _ => write!(f, "0x{}", hex::encode(bytes)),
            },
            Term::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Term::Set(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_form_roundtrip() {
        let term = Term::List(vec![
            Term::pair("k1".into(), "v1".into()),
            Term::atom_set(["a", "b"]),
        ]);

        let bytes = term.encode().unwrap();
        assert_eq!(Term::decode(&bytes).unwrap(), term);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(Term::decode(&[0xff, 0x00, 0x13]).is_err());
    }

    #[test]
    fn test_display() {
        let term = Term::List(vec![Term::pair("k1".into(), "v1".into())]);
        assert_eq!(term.to_string(), "[[k1 v1]]");
        assert_eq!(Term::atom(vec![0u8, 1]).to_string(), "0x0001");
    }
}
