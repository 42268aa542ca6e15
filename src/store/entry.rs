//! Stored Entry Module
//!
//! A payload held by `MemoryStore` together with its expiry.

use std::time::{SystemTime, UNIX_EPOCH};

// == Stored Entry ==
/// One payload and its store-enforced TTL.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Serialized payload
    pub payload: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    /// Creates an entry; a TTL of zero seconds means the entry never expires.
    pub fn new(payload: String, ttl_seconds: u64) -> Self {
        let expires_at = if ttl_seconds == 0 {
            None
        } else {
            Some(current_timestamp_ms().saturating_add(ttl_seconds.saturating_mul(1000)))
        };
        Self { payload, expires_at }
    }

    /// An entry is expired once the current time reaches its expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    /// Remaining TTL in milliseconds, `Some(0)` once expired.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
