//! Versioned key/value storage keyed by order index
//!
//! Every write is tagged with the order index of the transaction that made
//! it. A read "as of" index `i` returns, for each key, the entry with the
//! greatest order index `<= i`. This gives the ordering layer the serial
//! history it needs without ever rewriting old versions.
//!
//! Two implementations are provided:
//! - [`FjallStore`]: persistent, built on Fjall, one atomic batch per apply
//! - [`MemoryStore`]: in-memory, for tests and ephemeral nodes
//!
//! Besides plain key/value versions, stores keep a root index: the commitment
//! tree anchors recorded at each order index, searchable by anchor.

pub mod config;
pub mod effects;
pub mod encoding;
pub mod error;
pub mod fjall_store;
pub mod memory;
pub mod store;

pub use config::StorageConfig;
pub use effects::Effects;
pub use error::{Error, Result};
pub use fjall_store::FjallStore;
pub use memory::MemoryStore;
pub use store::{RESERVED_PREFIX, VersionedStore, is_reserved};
