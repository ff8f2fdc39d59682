//! The versioned store contract

use crate::effects::Effects;
use crate::error::{Error, Result};
use ordo_common::{Anchor, OrderIndex, Term};
use std::collections::{BTreeMap, BTreeSet};

/// Keys starting with this prefix hold node state
///
/// Program results never write under it. Backends that take keys from
/// programs must refuse them with [`is_reserved`].
pub const RESERVED_PREFIX: &[u8] = b"\x00ordo/";

pub fn is_reserved(key: &[u8]) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Table of byte keys whose values are versioned by order index
///
/// Implementations must apply each [`Effects`] atomically: a reader either
/// sees all of one transaction's effects or none of them.
pub trait VersionedStore: Send + Sync {
    /// Latest value of `key` written at an index `<= as_of`
    fn get(&self, key: &[u8], as_of: OrderIndex) -> Result<Option<Term>>;

    /// All keys starting with `prefix`, each at its latest version `<= as_of`,
    /// sorted by key
    fn scan_prefix(&self, prefix: &[u8], as_of: OrderIndex) -> Result<Vec<(Vec<u8>, Term)>>;

    /// Apply one transaction's effects at index `at`
    fn apply(&self, at: OrderIndex, effects: &Effects) -> Result<()>;

    /// Highest index `<= as_of` at which `anchor` was recorded
    fn root_height(&self, anchor: &Anchor, as_of: OrderIndex) -> Result<Option<OrderIndex>>;

    /// Most recent anchor recorded at an index `<= as_of`
    fn latest_root_at_or_before(&self, as_of: OrderIndex) -> Result<Option<(OrderIndex, Anchor)>>;

    /// Highest index at which effects were applied, `GENESIS` for a fresh store
    fn last_index(&self) -> Result<OrderIndex>;

    /// Overwrite a single key at `at`
    fn put(&self, key: &[u8], value: Term, at: OrderIndex) -> Result<()> {
        self.apply(at, &Effects::none().with_write(key, value))
    }

    /// Union `values` into the set stored at `key`, as a new version at `at`
    fn merge_set(&self, key: &[u8], values: BTreeSet<Term>, at: OrderIndex) -> Result<()> {
        self.apply(at, &Effects::none().with_append(key, values))
    }
}

/// Resolve effects into the final `(key, value)` versions to store at `at`
///
/// `lookup` reads the currently stored value (as of `at`). Writes come first,
/// so an append to a key written in the same effects unions into the new value.
pub(crate) fn resolve_effects<F>(
    effects: &Effects,
    at: OrderIndex,
    mut lookup: F,
) -> Result<BTreeMap<Vec<u8>, Term>>
where
    F: FnMut(&[u8], OrderIndex) -> Result<Option<Term>>,
{
    let mut resolved: BTreeMap<Vec<u8>, Term> = BTreeMap::new();

    for (key, value) in &effects.write {
        resolved.insert(key.clone(), value.clone());
    }

    for (key, values) in &effects.append {
        let current = match resolved.remove(key) {
            Some(value) => Some(value),
            None => lookup(key, at)?,
        };
        let merged = match current {
            None => values.clone(),
            Some(Term::Set(mut existing)) => {
                existing.extend(values.iter().cloned());
                existing
            }
            Some(_) => return Err(Error::NotASet(String::from_utf8_lossy(key).into_owned())),
        };
        resolved.insert(key.clone(), Term::Set(merged));
    }

    Ok(resolved)
}
