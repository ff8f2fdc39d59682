//! The write set of one transaction

use ordo_common::{Anchor, Term};
use std::collections::BTreeSet;

/// Everything one transaction writes, applied atomically at its order index
///
/// - `write` entries overwrite the key
/// - `append` entries are unioned into a set-valued key
/// - `anchor`, when present, is recorded in the root index
///
/// Within one set of effects, writes are applied before appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub write: Vec<(Vec<u8>, Term)>,
    pub append: Vec<(Vec<u8>, BTreeSet<Term>)>,
    pub anchor: Option<Anchor>,
}

impl Effects {
    /// No effects. Still advances the write watermark when applied.
    pub fn none() -> Self {
        Self::default()
    }

    /// Plain overwrites
    pub fn writes(pairs: Vec<(Vec<u8>, Term)>) -> Self {
        Self {
            write: pairs,
            ..Default::default()
        }
    }

    pub fn with_write(mut self, key: impl Into<Vec<u8>>, value: Term) -> Self {
        self.write.push((key.into(), value));
        self
    }

    pub fn with_append(mut self, key: impl Into<Vec<u8>>, values: BTreeSet<Term>) -> Self {
        self.append.push((key.into(), values));
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.write.is_empty() && self.append.is_empty() && self.anchor.is_none()
    }
}
