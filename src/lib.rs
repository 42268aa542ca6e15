//! memo_cache - memoization and invalidation over a TTL key-value store
//!
//! Wraps callables so results are stored under deterministic keys derived
//! from their arguments, and wraps updaters so the entries they make stale
//! are deleted.

pub mod codec;
pub mod config;
pub mod decorator;
pub mod error;
pub mod key;
pub mod store;
pub mod tasks;

pub use codec::{Mapping, Serializable, Serializer, Value};
pub use config::{Config, StoreBackend};
pub use decorator::{
    cache, invalidate_cache, random_prefix, CacheInfo, CacheSpec, Cached, InvalidateScope,
    InvalidateSpec, Invalidated, Invalidating,
};
pub use error::{CacheError, Result};
pub use key::{CacheKey, CallArgs, KeyBuilder, Role};
pub use store::{MemoryStore, SharedStore, Store};
pub use tasks::spawn_cleanup_task;
