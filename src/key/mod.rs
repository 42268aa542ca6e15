//! Key Module
//!
//! Call arguments, roles and the deterministic key builder.

mod args;
mod builder;

#[cfg(test)]
mod property_tests;

pub use args::CallArgs;
pub use builder::{
    escape_component, CacheKey, CallSignature, KeyBuilder, Role, ARG_SEPARATOR,
    DEFAULT_HASH_THRESHOLD, HASH_MARKER, KEY_SEPARATOR, KWARG_ASSIGN,
};
