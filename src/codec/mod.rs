//! Codec Module
//!
//! Value model and the serializer that turns values into stored payloads
//! and canonical key representations.

mod serializer;
mod value;


pub use serializer::{ReconstructHook, Serializer, DATA_TAG, MAP_TAG, TYPE_TAG};
pub use value::{Mapping, Serializable, Value};
