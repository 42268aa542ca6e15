//! Error types for the memoization layer
//!
//! Provides unified error handling using thiserror. None of these errors
//! ever reach the caller of a cached function; they surface through logs,
//! through `Invalidated::outcome`, and through the explicit helper methods.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for key derivation, payload encoding and store access.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An argument has no canonical key representation
    #[error("Non-serializable argument: {0}")]
    NonSerializableArgument(String),

    /// A result cannot be encoded into a storable payload
    #[error("Non-serializable value: {0}")]
    NonSerializableValue(String),

    /// The store backend failed or could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored payload could not be decoded
    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    /// A keyword named in `key_args` was not passed to the invalidator
    #[error("Missing key argument: {0}")]
    MissingKeyArgument(String),

    /// A cache or invalidation spec failed validation
    #[error("Invalid cache spec: {0}")]
    InvalidSpec(String),
}

impl CacheError {
    /// Returns true for failures of the store backend itself.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the memoization layer.
pub type Result<T> = std::result::Result<T, CacheError>;
