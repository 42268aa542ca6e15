//! Store Module
//!
//! The key-value store contract consumed by the cache wrappers, plus the
//! in-memory and Redis adapters.

mod entry;
mod memory;
mod pattern;
#[cfg(feature = "redis-store")]
mod redis;

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::error::Result;

pub use entry::StoredEntry;
pub use memory::MemoryStore;
pub use pattern::glob_match;
#[cfg(feature = "redis-store")]
pub use self::redis::RedisStore;

// == Store Trait ==
/// Key-value store with TTL semantics.
///
/// All operations are blocking. Backend failures are reported as
/// `CacheError::StoreUnavailable`; expiry and eviction belong to the store.
pub trait Store: Send + Sync {
    /// Returns `Ok(Some(payload))` on hit, `Ok(None)` on miss.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores a payload. A `ttl_seconds` of zero stores without expiry.
    fn set(&self, key: &str, payload: &str, ttl_seconds: u64) -> Result<()>;

    /// Deletes one key; returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Lists keys matching a Redis-style glob pattern.
    fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Deletes every key matching `pattern`; returns how many were removed.
    fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut deleted = 0;
        for key in self.scan(pattern)? {
            if self.delete(&key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Name of the backend, used in log fields.
    fn provider_name(&self) -> &'static str;
}

/// Store handle shared by every wrapper built over it.
pub type SharedStore = Arc<dyn Store>;

// == From Config ==
/// Builds the store selected by `config.backend`.
pub fn from_config(config: &Config) -> Result<SharedStore> {
    let store: SharedStore = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        #[cfg(feature = "redis-store")]
        StoreBackend::Redis => Arc::new(RedisStore::from_config(config)?),
        #[cfg(not(feature = "redis-store"))]
        StoreBackend::Redis => {
            return Err(crate::error::CacheError::InvalidSpec(
                "Redis backend requested but the `redis-store` feature is disabled".to_string(),
            ))
        }
    };
    info!(provider = store.provider_name(), "Cache store initialized");
    Ok(store)
}
