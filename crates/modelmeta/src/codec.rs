//! Value codec: native values <-> (text, type tag)
//!
//! | tag       | text                                   |
//! |-----------|----------------------------------------|
//! | `integer` | decimal                                |
//! | `double`  | shortest round-trip decimal            |
//! | `string`  | verbatim                               |
//! | `boolean` | `"1"` / `"0"`                          |
//! | `array`   | JSON                                   |
//! | `object`  | base64 of a bincode envelope           |
//! | `null`    | no text                                |
//!
//! Decoding never fails. An unknown tag, missing text, or text that does not
//! parse under its tag yields [`MetaValue::Null`].

use crate::error::{MetaError, MetaResult};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use modelmeta_common::ValueType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

/// A decoded metadata value
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MetaValue {
    #[default]
    Null,
    Integer(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    /// Structured data, restored as a generic JSON tree
    Array(JsonValue),
    /// Opaque serialized object that remembers its Rust type
    Object(ObjectValue),
}

impl MetaValue {
    /// Store structured data under the `array` tag
    pub fn array<T: Serialize + ?Sized>(value: &T) -> MetaResult<Self> {
        Ok(Self::Array(serde_json::to_value(value)?))
    }

    /// Store an arbitrary serializable value under the `object` tag
    pub fn object<T: Serialize + ?Sized>(value: &T) -> MetaResult<Self> {
        Ok(Self::Object(ObjectValue::new(value)?))
    }

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Integer(_) => ValueType::Integer,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Array(_) => ValueType::Array,
            Self::Object(_) => ValueType::Object,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> Option<&JsonValue> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for MetaValue {
            fn from(n: $t) -> Self {
                Self::Integer(i64::from(n))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for MetaValue {
    fn from(f: f64) -> Self {
        Self::Double(f)
    }
}

impl From<f32> for MetaValue {
    fn from(f: f32) -> Self {
        Self::Double(f64::from(f))
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for MetaValue {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<ObjectValue> for MetaValue {
    fn from(o: ObjectValue) -> Self {
        Self::Object(o)
    }
}

/// Scalars map to their own tags; arrays and maps become `Array`, as do
/// integers too large for `i64`.
impl From<JsonValue> for MetaValue {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if n.is_f64() {
                    n.as_f64().map_or(Self::Null, Self::Double)
                } else {
                    // u64 beyond i64::MAX: keep the exact JSON number
                    Self::Array(JsonValue::Number(n))
                }
            }
            JsonValue::String(s) => Self::String(s),
            v @ (JsonValue::Array(_) | JsonValue::Object(_)) => Self::Array(v),
        }
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A serialized value that records the Rust type it was built from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectValue {
    type_name: String,
    payload: Vec<u8>,
}

impl ObjectValue {
    /// Serialize `value` with bincode, remembering its type name
    pub fn new<T: Serialize + ?Sized>(value: &T) -> MetaResult<Self> {
        Ok(Self {
            type_name: std::any::type_name::<T>().to_string(),
            payload: bincode::serialize(value)?,
        })
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether this object was built from a `T`
    #[must_use]
    pub fn is<T: ?Sized>(&self) -> bool {
        self.type_name == std::any::type_name::<T>()
    }

    /// Deserialize back into the original type
    pub fn restore<T: DeserializeOwned>(&self) -> MetaResult<T> {
        if !self.is::<T>() {
            return Err(MetaError::ObjectTypeMismatch {
                stored: self.type_name.clone(),
                requested: std::any::type_name::<T>().to_string(),
            });
        }
        Ok(bincode::deserialize(&self.payload)?)
    }

    fn to_text(&self) -> MetaResult<String> {
        Ok(BASE64.encode(bincode::serialize(self)?))
    }

    fn from_text(text: &str) -> MetaResult<Self> {
        let bytes = BASE64.decode(text)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// A value ready to be written to the `value` / `value_type` columns
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoded {
    pub value: Option<String>,
    pub value_type: ValueType,
}

/// Encode a value into its stored text and tag
pub fn encode(value: &MetaValue) -> MetaResult<Encoded> {
    let text = match value {
        MetaValue::Null => None,
        MetaValue::Integer(n) => Some(n.to_string()),
        MetaValue::Double(f) => Some(f.to_string()),
        MetaValue::String(s) => Some(s.clone()),
        MetaValue::Boolean(b) => Some(i32::from(*b).to_string()),
        MetaValue::Array(v) => Some(serde_json::to_string(v)?),
        MetaValue::Object(o) => Some(o.to_text()?),
    };
    Ok(Encoded {
        value: text,
        value_type: value.value_type(),
    })
}

/// Decode stored text under its tag
#[must_use]
pub fn decode(text: Option<&str>, value_type: &str) -> MetaValue {
    let Some(tag) = ValueType::from_tag(value_type) else {
        return MetaValue::Null;
    };
    let Some(text) = text else {
        return MetaValue::Null;
    };
    let decoded = match tag {
        ValueType::Null => return MetaValue::Null,
        ValueType::String => return MetaValue::String(text.to_string()),
        ValueType::Integer => text.trim().parse().map(MetaValue::Integer).ok(),
        ValueType::Double => text.trim().parse().map(MetaValue::Double).ok(),
        ValueType::Boolean => text
            .trim()
            .parse::<i64>()
            .map(|n| MetaValue::Boolean(n != 0))
            .ok(),
        ValueType::Array => serde_json::from_str(text).map(MetaValue::Array).ok(),
        ValueType::Object => ObjectValue::from_text(text).map(MetaValue::Object).ok(),
    };
    decoded.unwrap_or_else(|| {
        warn!("Undecodable {} value, treating as null", tag);
        MetaValue::Null
    })
}
