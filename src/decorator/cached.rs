//! Cached Wrapper Module
//!
//! Memoizes a callable's results in the shared store.
//!
//! Per call: build key, read store, decode on hit; on miss invoke, encode
//! and write with the configured TTL. Cache failures never reach the
//! caller: they are logged and the call proceeds uncached.

use tracing::{debug, warn};

use crate::codec::{Serializer, Value};
use crate::decorator::spec::CacheSpec;
use crate::decorator::stats::{CacheInfo, CallStats};
use crate::error::Result;
use crate::key::{CacheKey, CallArgs, KeyBuilder};
use crate::store::SharedStore;

// == Cached ==
/// A callable wrapped with memoization.
///
/// `F` is either `Fn(&CallArgs) -> Result<Value, E>` (use [`Cached::call`])
/// or `Fn(&S, &CallArgs) -> Result<Value, E>` for methods (use
/// [`Cached::call_method`]).
pub struct Cached<F> {
    func: F,
    spec: CacheSpec,
    keys: KeyBuilder,
    serializer: Serializer,
    store: SharedStore,
    stats: CallStats,
}

/// Wraps `func` with the caching behavior described by `spec`.
pub fn cache<F>(spec: CacheSpec, store: SharedStore, func: F) -> Cached<F> {
    Cached::new(spec, store, func)
}

impl<F> Cached<F> {
    pub fn new(spec: CacheSpec, store: SharedStore, func: F) -> Self {
        let keys = spec.key_builder();
        Self {
            func,
            spec,
            keys,
            serializer: Serializer::new(),
            store,
            stats: CallStats::new(),
        }
    }

    /// Replaces the serializer used for payloads, e.g. to install a
    /// reconstruction hook.
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn spec(&self) -> &CacheSpec {
        &self.spec
    }

    /// The original callable; calling it never touches the store.
    pub fn wrapped(&self) -> &F {
        &self.func
    }

    /// Key for `args` as they would be passed to [`Cached::call`].
    pub fn key_for(&self, args: &CallArgs) -> Result<CacheKey> {
        self.keys.build(args)
    }

    /// Key for `args` as they would be passed to [`Cached::call_method`]
    /// with a receiver of type `S`.
    pub fn key_for_method<S: ?Sized>(&self, args: &CallArgs) -> Result<CacheKey> {
        self.keys.build(&method_args::<S>(args))
    }

    // == Cache Info ==
    /// Local hit/miss counters plus the number of keys under the prefix.
    pub fn cache_info(&self) -> CacheInfo {
        let currsize = match self.store.scan(&self.keys.prefix_pattern()) {
            Ok(keys) => Some(keys.len()),
            Err(e) => {
                warn!(prefix = %self.spec.prefix(), error = %e, "Cache size unavailable");
                None
            }
        };
        self.stats.snapshot(currsize)
    }

    // == Clear Cache ==
    /// Deletes every entry under the prefix and resets the counters.
    pub fn clear_cache(&self) -> Result<u64> {
        let deleted = self.store.delete_matching(&self.keys.prefix_pattern())?;
        self.stats.reset();
        debug!(prefix = %self.spec.prefix(), deleted = deleted, "Cache cleared");
        Ok(deleted)
    }

    // == Invalidate ==
    /// Deletes the entry stored for `args`; returns whether one existed.
    pub fn invalidate(&self, args: &CallArgs) -> Result<bool> {
        let key = self.keys.build(args)?;
        let removed = self.store.delete(key.as_str())?;
        debug!(key = %key, removed = removed, "Cache entry invalidated");
        Ok(removed)
    }

    /// Deletes the entry stored by [`Cached::call_method`] for `args`.
    pub fn invalidate_method<S: ?Sized>(&self, args: &CallArgs) -> Result<bool> {
        self.invalidate(&method_args::<S>(args))
    }

    // == Call ==
    /// Calls through the cache.
    pub fn call<E>(&self, args: &CallArgs) -> std::result::Result<Value, E>
    where
        F: Fn(&CallArgs) -> std::result::Result<Value, E>,
    {
        self.execute(self.keys.build(args), true, || (self.func)(args))
    }

    /// Invokes the callable without a lookup and overwrites the stored entry.
    pub fn bypass<E>(&self, args: &CallArgs) -> std::result::Result<Value, E>
    where
        F: Fn(&CallArgs) -> std::result::Result<Value, E>,
    {
        self.execute(self.keys.build(args), false, || (self.func)(args))
    }

    // == Call Method ==
    /// Calls a method through the cache.
    ///
    /// The receiver occupies the first positional slot and is excluded from
    /// the key by the bound-method role; for any other role the receiver has
    /// no key representation and the call is not cached.
    pub fn call_method<S, E>(&self, receiver: &S, args: &CallArgs) -> std::result::Result<Value, E>
    where
        S: ?Sized,
        F: Fn(&S, &CallArgs) -> std::result::Result<Value, E>,
    {
        let key = self.keys.build(&method_args::<S>(args));
        self.execute(key, true, || (self.func)(receiver, args))
    }

    pub fn bypass_method<S, E>(
        &self,
        receiver: &S,
        args: &CallArgs,
    ) -> std::result::Result<Value, E>
    where
        S: ?Sized,
        F: Fn(&S, &CallArgs) -> std::result::Result<Value, E>,
    {
        let key = self.keys.build(&method_args::<S>(args));
        self.execute(key, false, || (self.func)(receiver, args))
    }

    fn execute<E, I>(
        &self,
        key: Result<CacheKey>,
        lookup: bool,
        invoke: I,
    ) -> std::result::Result<Value, E>
    where
        I: FnOnce() -> std::result::Result<Value, E>,
    {
        let key = match key {
            Ok(key) => key,
            Err(e) => {
                warn!(prefix = %self.spec.prefix(), error = %e, "No cache key; calling uncached");
                return invoke();
            }
        };

        if lookup {
            if let Some(value) = self.lookup(&key) {
                self.stats.record_hit();
                return Ok(value);
            }
            self.stats.record_miss();
        }

        let value = invoke()?;
        self.write(&key, &value);
        Ok(value)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Value> {
        let payload = match self.store.get(key.as_str()) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(key = %key, "Cache MISS");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed; treating as miss");
                return None;
            }
        };

        match self.serializer.decode(&payload) {
            Ok(value) => {
                debug!(key = %key, "Cache HIT");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload unreadable; treating as miss");
                None
            }
        }
    }

    fn write(&self, key: &CacheKey, value: &Value) {
        let payload = match self.serializer.encode(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Result not cacheable; skipping write");
                return;
            }
        };

        match self.store.set(key.as_str(), &payload, self.spec.timeout()) {
            Ok(()) => debug!(key = %key, ttl_seconds = self.spec.timeout(), "Cache SET"),
            Err(e) => warn!(key = %key, error = %e, "Cache write failed"),
        }
    }
}

/// Method arguments with the receiver slot filled, as the key builder sees them.
fn method_args<S: ?Sized>(args: &CallArgs) -> CallArgs {
    args.with_receiver(Value::opaque::<S>())
}
