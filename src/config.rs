//! Configuration Module
//!
//! Handles loading the store connection and key-building settings from
//! environment variables.

use std::env;
use std::time::Duration;

use crate::key::DEFAULT_HASH_THRESHOLD;

// == Store Backend ==
/// Which store adapter `store::from_config` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process `MemoryStore`
    Memory,
    /// Shared Redis server
    Redis,
}

impl StoreBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "redis" => Some(StoreBackend::Redis),
            _ => None,
        }
    }
}

impl Default for StoreBackend {
    fn default() -> Self {
        if cfg!(feature = "redis-store") {
            StoreBackend::Redis
        } else {
            StoreBackend::Memory
        }
    }
}

/// Memoization layer configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store adapter to construct
    pub backend: StoreBackend,
    /// Redis connection URL
    pub redis_url: String,
    /// Connect/read/write timeout for Redis sockets, in milliseconds
    pub socket_timeout_ms: u64,
    /// Argument-portion length above which keys are hashed
    pub key_hash_threshold: usize,
    /// Memory-store cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `redis` (default: `redis` when built with Redis support)
    /// - `REDIS_URL` - Redis URL (default: redis://localhost:6379/0)
    /// - `REDIS_SOCKET_TIMEOUT_MS` - Socket timeout (default: 1000)
    /// - `CACHE_KEY_HASH_THRESHOLD` - Key hashing threshold (default: 200)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| StoreBackend::parse(&v))
                .unwrap_or(defaults.backend),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            socket_timeout_ms: env::var("REDIS_SOCKET_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.socket_timeout_ms),
            key_hash_threshold: env::var("CACHE_KEY_HASH_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.key_hash_threshold),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Socket timeout as a Duration.
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: "redis://localhost:6379/0".to_string(),
            socket_timeout_ms: 1000,
            key_hash_threshold: DEFAULT_HASH_THRESHOLD,
            cleanup_interval: 1,
        }
    }
}
