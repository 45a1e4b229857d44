//! Content-addressed cache of derived tables.
//!
//! One upload triggers one reshape-and-derive transform; repeated
//! interaction with the same content must not re-run it. The key is the
//! SHA-256 digest of the raw input bytes, so re-uploading identical content
//! reuses the cached derivation deterministically. Cached tables are shared
//! read-only behind `Arc` and never mutated.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::ingest::{content_hash, read_delimited};
use crate::transform::{DerivedTables, derive_tables};

/// Cache of derived tables keyed by input-content digest.
#[derive(Debug, Default)]
pub struct DerivedCache {
    entries: HashMap<String, Arc<DerivedTables>>,
}

impl DerivedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Parse and derive `bytes`, or return the cached tables for identical
    /// content.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<DerivedTables>> {
        let key = content_hash(bytes);
        if let Some(hit) = self.entries.get(&key) {
            tracing::debug!(key = %key, "derived-table cache hit");
            return Ok(Arc::clone(hit));
        }

        let tables = Arc::new(derive_tables(read_delimited(bytes)?)?);
        self.entries.insert(key, Arc::clone(&tables));
        Ok(tables)
    }

    /// Drop the entry for one content digest, if present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every cached derivation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached derivations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &[u8] =
        b"shift_booked_time_1,job_done_1\n2024-01-01 09:00:00,1\n2024-01-02 10:00:00,0\n";

    #[test]
    fn test_identical_content_hits_cache() {
        let mut cache = DerivedCache::new();

        let first = cache.load(INPUT).unwrap();
        let second = cache.load(INPUT).unwrap();

        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_different_content_derives_again() {
        let mut cache = DerivedCache::new();

        cache.load(INPUT).unwrap();
        cache
            .load(b"shift_booked_time_1,job_done_1\n2024-02-01 09:00:00,1\n")
            .unwrap();

        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = DerivedCache::new();
        cache.load(INPUT).unwrap();

        let key = content_hash(INPUT);
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unreadable_input_is_not_cached() {
        let mut cache = DerivedCache::new();
        assert!(cache.load(b"").is_err());
        assert!(cache.is_empty());
    }
}
