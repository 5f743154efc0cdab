//! In-memory result cache, used when no cache path is configured

use crate::check::CompactSnapshot;
use crate::storage::traits::{ResultCache, StorageResult};
use std::collections::HashMap;

/// Result cache living for one run
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, CompactSnapshot>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, cache_key: &str) -> StorageResult<Option<CompactSnapshot>> {
        Ok(self.entries.get(cache_key).cloned())
    }

    fn put(&mut self, cache_key: &str, snapshot: &CompactSnapshot) -> StorageResult<()> {
        self.entries.insert(cache_key.to_string(), snapshot.clone());
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.entries.len())
    }
}
