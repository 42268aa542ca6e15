//! Memory Store Module
//!
//! In-process store adapter: a HashMap of payloads with lazy TTL expiry
//! and a sweep used by the background cleanup task.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::store::entry::StoredEntry;
use crate::store::pattern::glob_match;
use crate::store::Store;

// == Memory Store ==
/// Store adapter keeping entries in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Remaining TTL of a live entry in milliseconds; `None` for missing
    /// entries and entries without expiry.
    pub fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(StoredEntry::ttl_remaining_ms)
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.payload.clone())),
            Some(_) => {}
        }
        // Expired entries are dropped on read
        entries.remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, payload: &str, ttl_seconds: u64) -> Result<()> {
        let entry = StoredEntry::new(payload.to_string(), ttl_seconds);
        self.entries.lock().insert(key.to_string(), entry);
        debug!(key = key, ttl_seconds = ttl_seconds, "Memory store SET");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.entries.lock().remove(key);
        Ok(matches!(removed, Some(entry) if !entry.is_expired()))
    }

    fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
