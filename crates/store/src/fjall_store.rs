//! Persistent versioned store on Fjall
//!
//! Layout:
//! - `versions`: one entry per (key, order index), see [`crate::encoding`]
//! - `roots_by_height`: order index -> anchor recorded there
//! - `heights_by_root`: (anchor, order index) -> (), for anchor lookups
//! - `meta`: the highest applied order index
//!
//! Each [`Effects`] is written with a single Fjall batch, so a transaction's
//! versions and its anchor become visible together.

use crate::config::StorageConfig;
use crate::effects::Effects;
use crate::encoding::{
    Decode, Encode, decode_version_key, encode_root_key, encode_version_key, escape_key,
};
use crate::error::Result;
use crate::store::{VersionedStore, resolve_effects};
use fjall::{CompressionType, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use ordo_common::{Anchor, GENESIS, OrderIndex, Term};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;

const LAST_INDEX_KEY: &[u8] = b"last_index";

/// Versioned store backed by a Fjall keyspace
pub struct FjallStore {
    keyspace: Keyspace,
    versions: PartitionHandle,
    roots_by_height: PartitionHandle,
    heights_by_root: PartitionHandle,
    meta: PartitionHandle,
    persist_mode: PersistMode,
    /// Highest applied index; the lock also serializes set merges
    last_index: Mutex<OrderIndex>,
}

impl FjallStore {
    /// Open (or create) the store in the configured data directory
    pub fn new(config: StorageConfig) -> Result<Self> {
        Self::open_at_path(&config.data_dir.clone(), config)
    }

    /// Open storage at a specific path
    pub fn open_at_path(path: &Path, config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let keyspace = fjall::Config::new(path)
            .cache_size(config.block_cache_size)
            .open()?;

        let versions = keyspace.open_partition(
            "versions",
            PartitionCreateOptions::default()
                .block_size(config.version_block_size)
                .compression(config.version_compression),
        )?;

        let roots_by_height = keyspace.open_partition(
            "roots_by_height",
            PartitionCreateOptions::default()
                .block_size(config.index_block_size)
                .compression(CompressionType::None),
        )?;

        let heights_by_root = keyspace.open_partition(
            "heights_by_root",
            PartitionCreateOptions::default()
                .block_size(config.index_block_size)
                .compression(CompressionType::None),
        )?;

        let meta = keyspace.open_partition("meta", PartitionCreateOptions::default())?;
        let last_index = match meta.get(LAST_INDEX_KEY)? {
            Some(bytes) => OrderIndex::decode(&bytes)?,
            None => GENESIS,
        };

        tracing::debug!(
            "Opened versioned store at {} (last index {})",
            path.display(),
            last_index
        );

        Ok(Self {
            keyspace,
            versions,
            roots_by_height,
            heights_by_root,
            meta,
            persist_mode: config.persist_mode,
            last_index: Mutex::new(last_index),
        })
    }

    /// Get the keyspace (for custom operations)
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }
}

impl VersionedStore for FjallStore {
    fn get(&self, key: &[u8], as_of: OrderIndex) -> Result<Option<Term>> {
        let start = encode_version_key(key, 0);
        let end = encode_version_key(key, as_of);

        match self.versions.range(start..=end).next_back() {
            Some(entry) => {
                let (_, value_bytes) = entry?;
                Ok(Some(<Term as Decode>::decode(&value_bytes)?))
            }
            None => Ok(None),
        }
    }

    fn scan_prefix(&self, prefix: &[u8], as_of: OrderIndex) -> Result<Vec<(Vec<u8>, Term)>> {
        // Versions are sorted by key then index, so the last visible one wins
        let mut latest: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

        for entry in self.versions.prefix(escape_key(prefix)) {
            let (encoded_key, value_bytes) = entry?;
            let (key, index) = decode_version_key(&encoded_key)?;
            if index <= as_of {
                latest.insert(key, value_bytes.to_vec());
            }
        }

        latest
            .into_iter()
            .map(|(key, bytes)| Ok((key, <Term as Decode>::decode(&bytes)?)))
            .collect()
    }

    fn apply(&self, at: OrderIndex, effects: &Effects) -> Result<()> {
        let mut last_index = self.last_index.lock();

        let resolved = resolve_effects(effects, at, |key, as_of| self.get(key, as_of))?;

        let mut batch = self.keyspace.batch();
        for (key, value) in resolved {
            batch.insert(&self.versions, encode_version_key(&key, at), value.encode()?);
        }
        if let Some(anchor) = &effects.anchor {
            batch.insert(&self.roots_by_height, at.encode()?, anchor.encode()?);
            batch.insert(&self.heights_by_root, encode_root_key(anchor, at), Vec::<u8>::new());
        }
        if at > *last_index {
            batch.insert(&self.meta, LAST_INDEX_KEY, at.encode()?);
        }
        batch.commit()?;
        *last_index = (*last_index).max(at);

        self.keyspace.persist(self.persist_mode)?;
        Ok(())
    }

    fn last_index(&self) -> Result<OrderIndex> {
        Ok(*self.last_index.lock())
    }

    fn root_height(&self, anchor: &Anchor, as_of: OrderIndex) -> Result<Option<OrderIndex>> {
        let start = encode_root_key(anchor, 0);
        let end = encode_root_key(anchor, as_of);

        match self.heights_by_root.range(start..=end).next_back() {
            Some(entry) => {
                let (key, _) = entry?;
                Ok(Some(OrderIndex::decode(&key[Anchor::LEN..])?))
            }
            None => Ok(None),
        }
    }

    fn latest_root_at_or_before(&self, as_of: OrderIndex) -> Result<Option<(OrderIndex, Anchor)>> {
        match self.roots_by_height.range(..=as_of.encode()?).next_back() {
            Some(entry) => {
                let (key, value) = entry?;
                Ok(Some((OrderIndex::decode(&key)?, Anchor::decode(&value)?)))
            }
            None => Ok(None),
        }
    }
}

impl Drop for FjallStore {
    fn drop(&mut self) {
        // Ensure data is persisted on drop
        let _ = self.keyspace.persist(PersistMode::SyncAll);
    }
}
