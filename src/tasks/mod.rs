//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: sweeps expired `MemoryStore` entries at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
