//! Transaction identifier
//!
//! Ids arrive from the submitter or mempool as opaque byte strings. Locally
//! generated ids are UUIDv7 bytes so they stay roughly time-ordered.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, immutable identifier of one submitted transaction
///
/// Used as the correlation key for every read, write and event belonging to
/// the transaction. Equality and ordering are byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(Vec<u8>);

impl TransactionId {
    /// Wrap submitter-provided bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Generate a fresh id using UUIDv7
    pub fn generate() -> Self {
        Self(Uuid::now_v7().as_bytes().to_vec())
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for TransactionId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Printable ids (the common case for submitter-chosen names) are shown
        // as-is, everything else as hex.
        match std::str::from_utf8(&self.0) {
            Ok(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_graphic()) => write!(f, "{}", s),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let id1 = TransactionId::generate();
        let id2 = TransactionId::generate();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_bytes().len(), 16);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionId::from("t1").to_string(), "t1");
        assert_eq!(TransactionId::new(vec![0x00, 0xff]).to_string(), "0x00ff");
    }

    #[test]
    fn test_hash_eq_consistency() {
        use std::collections::HashMap;

        let id1 = TransactionId::from("tx");
        let id2 = id1.clone();

        let mut map = HashMap::new();
        map.insert(id1, "value");

        assert_eq!(map.get(&id2), Some(&"value"));
    }
}
