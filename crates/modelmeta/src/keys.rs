//! Key arguments: a single key or a list of keys

use crate::error::{MetaError, MetaResult};
use serde_json::Value as JsonValue;

/// One key or several keys, as accepted by lookups and removals
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeySelector {
    One(String),
    Many(Vec<String>),
}

impl KeySelector {
    #[must_use]
    pub const fn is_single(&self) -> bool {
        matches!(self, Self::One(_))
    }

    /// Flatten into a key list, input order preserved
    #[must_use]
    pub fn into_keys(self) -> Vec<String> {
        match self {
            Self::One(key) => vec![key],
            Self::Many(keys) => keys,
        }
    }
}

impl From<&str> for KeySelector {
    fn from(key: &str) -> Self {
        Self::One(key.to_string())
    }
}

impl From<String> for KeySelector {
    fn from(key: String) -> Self {
        Self::One(key)
    }
}

impl From<&String> for KeySelector {
    fn from(key: &String) -> Self {
        Self::One(key.clone())
    }
}

impl From<Vec<String>> for KeySelector {
    fn from(keys: Vec<String>) -> Self {
        Self::Many(keys)
    }
}

impl From<Vec<&str>> for KeySelector {
    fn from(keys: Vec<&str>) -> Self {
        Self::Many(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeySelector {
    fn from(keys: &[&str]) -> Self {
        Self::Many(keys.iter().map(|k| (*k).to_string()).collect())
    }
}

impl From<&[String]> for KeySelector {
    fn from(keys: &[String]) -> Self {
        Self::Many(keys.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for KeySelector {
    fn from(keys: [&str; N]) -> Self {
        Self::Many(keys.iter().map(|k| (*k).to_string()).collect())
    }
}

/// Keys arriving as untyped JSON: a string or an array of strings.
impl TryFrom<&JsonValue> for KeySelector {
    type Error = MetaError;

    fn try_from(value: &JsonValue) -> MetaResult<Self> {
        match value {
            JsonValue::String(key) => Ok(Self::One(key.clone())),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        MetaError::invalid_key_type(format!("expected a string key, got {item}"))
                    })
                })
                .collect::<MetaResult<Vec<_>>>()
                .map(Self::Many),
            other => Err(MetaError::invalid_key_type(format!(
                "keys must be a string or an array of strings, got {other}"
            ))),
        }
    }
}
