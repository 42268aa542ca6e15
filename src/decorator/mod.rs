//! Decorator Module
//!
//! Wrappers that add memoization or invalidation to a callable.
//!
//! # Components
//! - `Cached`: key -> lookup -> decode on hit, invoke -> encode -> store on miss
//! - `Invalidating`: invoke, then delete the matching key or key family
//! - `CacheSpec` / `InvalidateSpec`: validated wrapper settings

mod cached;
mod invalidate;
mod spec;
mod stats;

pub use cached::{cache, Cached};
pub use invalidate::{invalidate_cache, Invalidated, Invalidating};
pub use spec::{
    random_prefix, CacheSpec, CacheSpecBuilder, InvalidateScope, InvalidateSpec,
    InvalidateSpecBuilder,
};
pub use stats::{CacheInfo, CallStats};
