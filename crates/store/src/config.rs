//! Storage configuration

use fjall::{CompressionType, PersistMode};
use std::path::PathBuf;

/// Configuration for the persistent versioned store
#[derive(Clone)]
pub struct StorageConfig {
    /// Directory holding the keyspace
    pub data_dir: PathBuf,

    /// Fjall block cache shared by all partitions (in bytes)
    pub block_cache_size: u64,

    /// Compression for value versions; the root indices are never compressed
    pub version_compression: CompressionType,

    /// Block size of the version partition (in bytes)
    pub version_block_size: u32,

    /// Block size of the two root index partitions (in bytes)
    pub index_block_size: u32,

    /// Durability requested after every applied transaction
    pub persist_mode: PersistMode,
}

impl Default for StorageConfig {
    /// A fresh directory per config, kept after the process exits
    fn default() -> Self {
        let data_dir = tempfile::tempdir()
            .map(|dir| dir.keep())
            .unwrap_or_else(|_| std::env::temp_dir().join("ordo-store"));
        Self::new(data_dir)
    }
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            block_cache_size: 64 * 1024 * 1024, // 64 MB
            version_compression: CompressionType::Lz4,
            version_block_size: 64 * 1024,
            index_block_size: 16 * 1024,
            persist_mode: PersistMode::Buffer,
        }
    }

    pub fn with_block_cache_size(mut self, size: u64) -> Self {
        self.block_cache_size = size;
        self
    }

    pub fn with_version_compression(mut self, compression: CompressionType) -> Self {
        self.version_compression = compression;
        self
    }

    pub fn with_block_sizes(mut self, version: u32, index: u32) -> Self {
        self.version_block_size = version;
        self.index_block_size = index;
        self
    }

    /// Flush to the OS or sync to disk after each transaction
    pub fn with_persist_mode(mut self, mode: PersistMode) -> Self {
        self.persist_mode = mode;
        self
    }
}
