//! In-memory versioned store

use crate::effects::Effects;
use crate::error::Result;
use crate::store::{VersionedStore, resolve_effects};
use ordo_common::{Anchor, OrderIndex, Term};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
struct Inner {
    /// key -> (order index -> value)
    versions: BTreeMap<Vec<u8>, BTreeMap<OrderIndex, Term>>,
    /// order index -> anchor recorded there
    roots: BTreeMap<OrderIndex, Anchor>,
    last_index: OrderIndex,
}

impl Inner {
    fn get(&self, key: &[u8], as_of: OrderIndex) -> Option<Term> {
        self.versions
            .get(key)?
            .range(..=as_of)
            .next_back()
            .map(|(_, value)| value.clone())
    }
}

/// Versioned store held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionedStore for MemoryStore {
    fn get(&self, key: &[u8], as_of: OrderIndex) -> Result<Option<Term>> {
        Ok(self.inner.read().get(key, as_of))
    }

    fn scan_prefix(&self, prefix: &[u8], as_of: OrderIndex) -> Result<Vec<(Vec<u8>, Term)>> {
        let inner = self.inner.read();
        let entries = inner
            .versions
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, versions)| {
                versions
                    .range(..=as_of)
                    .next_back()
                    .map(|(_, value)| (key.clone(), value.clone()))
            })
            .collect();
        Ok(entries)
    }

    fn apply(&self, at: OrderIndex, effects: &Effects) -> Result<()> {
        let mut inner = self.inner.write();
        let resolved = resolve_effects(effects, at, |key, as_of| Ok(inner.get(key, as_of)))?;

        for (key, value) in resolved {
            inner.versions.entry(key).or_default().insert(at, value);
        }
        if let Some(anchor) = effects.anchor {
            inner.roots.insert(at, anchor);
        }
        inner.last_index = inner.last_index.max(at);
        Ok(())
    }

    fn last_index(&self) -> Result<OrderIndex> {
        Ok(self.inner.read().last_index)
    }

    fn root_height(&self, anchor: &Anchor, as_of: OrderIndex) -> Result<Option<OrderIndex>> {
        let inner = self.inner.read();
        Ok(inner
            .roots
            .range(..=as_of)
            .rev()
            .find(|(_, recorded)| *recorded == anchor)
            .map(|(height, _)| *height))
    }

    fn latest_root_at_or_before(&self, as_of: OrderIndex) -> Result<Option<(OrderIndex, Anchor)>> {
        let inner = self.inner.read();
        Ok(inner
            .roots
            .range(..=as_of)
            .next_back()
            .map(|(height, anchor)| (*height, *anchor)))
    }
}
