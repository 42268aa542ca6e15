//! Serializer Module
//!
//! Two independent conversions: value <-> stored payload, and value -> key
//! representation.

use std::fmt;
use std::sync::Arc;

use crate::codec::value::{float_to_json, Mapping, Value};
use crate::error::{CacheError, Result};

// == Envelope Tags ==
/// Reserved key naming the exported object's type.
pub const TYPE_TAG: &str = "__cache_type__";

/// Reserved key holding the exported object's mapping.
pub const DATA_TAG: &str = "__cache_data__";

/// Reserved key wrapping a plain mapping that would otherwise read as an
/// envelope or as another wrapped mapping.
pub const MAP_TAG: &str = "__cache_map__";

/// Rebuilds a value from an exported object's type name and mapping.
///
/// Returning `None` leaves the mapping form in place.
pub type ReconstructHook = Arc<dyn Fn(&str, &Mapping) -> Option<Value> + Send + Sync>;

// == Serializer ==
/// JSON codec for cached results and canonical argument representations.
#[derive(Clone, Default)]
pub struct Serializer {
    hook: Option<ReconstructHook>,
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("hook", &self.hook.as_ref().map(|_| "ReconstructHook"))
            .finish()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a hook consulted for every exported object found on decode.
    pub fn with_reconstruct_hook<H>(mut self, hook: H) -> Self
    where
        H: Fn(&str, &Mapping) -> Option<Value> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    // == Encode ==
    /// Encodes a value into its stored payload.
    ///
    /// Exported objects are wrapped in a `{TYPE_TAG, DATA_TAG}` envelope.
    /// Opaque values and non-finite floats fail with `NonSerializableValue`.
    pub fn encode(&self, value: &Value) -> Result<String> {
        let json = tagged_json(value).map_err(into_value_error)?;
        serde_json::to_string(&json).map_err(|e| CacheError::NonSerializableValue(e.to_string()))
    }

    // == Decode ==
    /// Decodes a stored payload.
    ///
    /// An envelope becomes its mapping unless the reconstruction hook
    /// returns a replacement.
    pub fn decode(&self, payload: &str) -> Result<Value> {
        let json: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| CacheError::CorruptPayload(e.to_string()))?;
        Ok(self.untag(json))
    }

    // == Key Representation ==
    /// Canonical text of a value for use inside a cache key.
    ///
    /// Strings are quoted, sequence order is kept, mapping keys are sorted,
    /// objects render as their envelope. This text may still contain key
    /// separators; the key builder escapes it.
    pub fn key_repr(&self, value: &Value) -> Result<String> {
        let json = tagged_json(value).map_err(|e| match e {
            Reject::Opaque(type_name) => CacheError::NonSerializableArgument(format!(
                "argument of type `{}` has no export capability",
                type_name
            )),
            Reject::Float(f) => {
                CacheError::NonSerializableArgument(format!("non-finite float {}", f))
            }
        })?;
        serde_json::to_string(&json).map_err(|e| CacheError::NonSerializableArgument(e.to_string()))
    }

    fn untag(&self, json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(|item| self.untag(item)).collect())
            }
            serde_json::Value::Object(mut map) => {
                if is_wrapped_mapping(&map) {
                    if let Some(serde_json::Value::Object(inner)) = map.remove(MAP_TAG) {
                        return Value::Map(self.untag_fields(inner));
                    }
                }
                if is_envelope(&map) {
                    let type_name = match map.remove(TYPE_TAG) {
                        Some(serde_json::Value::String(name)) => name,
                        _ => String::new(),
                    };
                    let data = match map.remove(DATA_TAG) {
                        Some(serde_json::Value::Object(data)) => data,
                        _ => serde_json::Map::new(),
                    };
                    let mapping = self.untag_fields(data);
                    if let Some(rebuilt) = self.hook.as_ref().and_then(|h| h(&type_name, &mapping)) {
                        return rebuilt;
                    }
                    return Value::Map(mapping);
                }
                Value::Map(self.untag_fields(map))
            }
            scalar => Value::from(scalar),
        }
    }

    fn untag_fields(&self, fields: serde_json::Map<String, serde_json::Value>) -> Mapping {
        fields.into_iter().map(|(k, v)| (k, self.untag(v))).collect()
    }
}

fn is_envelope(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.len() == 2
        && matches!(map.get(TYPE_TAG), Some(serde_json::Value::String(_)))
        && matches!(map.get(DATA_TAG), Some(serde_json::Value::Object(_)))
}

fn is_wrapped_mapping(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.len() == 1 && matches!(map.get(MAP_TAG), Some(serde_json::Value::Object(_)))
}

enum Reject {
    Opaque(&'static str),
    Float(f64),
}

fn into_value_error(reject: Reject) -> CacheError {
    match reject {
        Reject::Opaque(type_name) => CacheError::NonSerializableValue(format!(
            "value of type `{}` has no export capability",
            type_name
        )),
        Reject::Float(f) => CacheError::NonSerializableValue(format!("non-finite float {}", f)),
    }
}

/// JSON form shared by payloads and key representations.
fn tagged_json(value: &Value) -> std::result::Result<serde_json::Value, Reject> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => float_to_json(*f).map_err(|_| Reject::Float(*f))?,
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Seq(items) => serde_json::Value::Array(
            items
                .iter()
                .map(tagged_json)
                .collect::<std::result::Result<_, _>>()?,
        ),
        Value::Map(map) => tagged_mapping(map)?,
        Value::Object(object) => {
            let mut envelope = serde_json::Map::new();
            envelope.insert(
                TYPE_TAG.to_string(),
                serde_json::Value::String(object.type_name().to_string()),
            );
            envelope.insert(
                DATA_TAG.to_string(),
                serde_json::Value::Object(tagged_fields(&object.export())?),
            );
            serde_json::Value::Object(envelope)
        }
        Value::Opaque(type_name) => return Err(Reject::Opaque(type_name)),
    })
}

/// A plain mapping in value position. Mappings shaped like an envelope or a
/// wrapped mapping are wrapped under `MAP_TAG` so decoding keeps them plain.
fn tagged_mapping(map: &Mapping) -> std::result::Result<serde_json::Value, Reject> {
    let fields = tagged_fields(map)?;
    if !is_envelope(&fields) && !is_wrapped_mapping(&fields) {
        return Ok(serde_json::Value::Object(fields));
    }
    let mut wrapper = serde_json::Map::new();
    wrapper.insert(MAP_TAG.to_string(), serde_json::Value::Object(fields));
    Ok(serde_json::Value::Object(wrapper))
}

// Mapping iterates in key order, so the JSON object is written sorted.
fn tagged_fields(
    map: &Mapping,
) -> std::result::Result<serde_json::Map<String, serde_json::Value>, Reject> {
    let mut out = serde_json::Map::new();
    for (key, value) in map {
        out.insert(key.clone(), tagged_json(value)?);
    }
    Ok(out)
}
