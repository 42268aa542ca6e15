//! Value Module
//!
//! Dynamic value model carried through key derivation and payload encoding.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Mapping form used for keyed values and exported objects.
pub type Mapping = BTreeMap<String, Value>;

// == Serializable Capability ==
/// Export capability for values that are neither scalars nor collections.
///
/// Implementors are stored as their exported mapping, tagged with
/// `type_name()`. A cache hit yields the mapping, not the original type,
/// unless a reconstruction hook is installed on the `Serializer`.
pub trait Serializable: fmt::Debug + Send + Sync {
    /// Name recorded next to the exported mapping.
    fn type_name(&self) -> &str;

    /// Exports the object as a mapping of encodable values.
    fn export(&self) -> Mapping;
}

// == Value ==
/// An argument or result as seen by the cache.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(Mapping),
    /// Object exposing the export capability
    Object(Arc<dyn Serializable>),
    /// Handle with no encodable shape; carries its type name for diagnostics
    Opaque(&'static str),
}

impl Value {
    /// Wraps an exportable object.
    pub fn object<T: Serializable + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Placeholder for a value of type `T` that cannot be serialized.
    pub fn opaque<T: ?Sized>() -> Self {
        Value::Opaque(std::any::type_name::<T>())
    }

    /// Builds a Value from any serde-serializable type.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let json = serde_json::to_value(value)
            .map_err(|e| CacheError::NonSerializableValue(e.to_string()))?;
        Ok(Value::from(json))
    }

    /// Reconstructs a typed value from this value's JSON shape.
    ///
    /// Exported objects are seen through their mapping, so a cached
    /// `Serializable` result can be rebuilt into a `Deserialize` type.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        let json = self.to_json().map_err(|e| match e {
            CacheError::NonSerializableValue(msg) => CacheError::CorruptPayload(msg),
            other => other,
        })?;
        serde_json::from_value(json).map_err(|e| CacheError::CorruptPayload(e.to_string()))
    }

    /// Converts to plain JSON. Objects contribute their exported mapping.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => float_to_json(*f)?,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Seq(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_>>()?,
            ),
            Value::Map(map) => mapping_to_json(map)?,
            Value::Object(object) => mapping_to_json(&object.export())?,
            Value::Opaque(type_name) => {
                return Err(CacheError::NonSerializableValue(format!(
                    "value of type `{}` has no export capability",
                    type_name
                )))
            }
        })
    }

    /// Short name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

pub(crate) fn float_to_json(f: f64) -> Result<serde_json::Value> {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .ok_or_else(|| CacheError::NonSerializableValue(format!("non-finite float {}", f)))
}

pub(crate) fn mapping_to_json(map: &Mapping) -> Result<serde_json::Value> {
    let mut out = serde_json::Map::new();
    for (key, value) in map {
        out.insert(key.clone(), value.to_json()?);
    }
    Ok(serde_json::Value::Object(out))
}

// == Equality ==
// Objects compare through their exported form.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.type_name() == b.type_name() && a.export() == b.export()
            }
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

// == Conversions ==
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! int_into_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(i: $ty) -> Self {
                Value::Int(i64::from(i))
            }
        })*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(map: HashMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}
