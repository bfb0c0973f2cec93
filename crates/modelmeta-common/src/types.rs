//! Core type definitions for ModelMeta
//!
//! An owner is addressed by a type discriminator and a numeric id. Every
//! stored value carries one of the [`ValueType`] tags alongside its text.

use crate::error::{Error, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference to a persisted owner: the stored type discriminator plus its id
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{owner_type}#{owner_id}")]
pub struct OwnerRef {
    /// Type discriminator as written to the `owner_type` column
    pub owner_type: String,
    /// Store-assigned id of the owner
    pub owner_id: i64,
}

impl OwnerRef {
    /// Create a new owner reference (validates the discriminator)
    pub fn new(owner_type: impl Into<String>, owner_id: i64) -> Result<Self> {
        let owner_type = owner_type.into();
        Self::validate(&owner_type)?;
        Ok(Self {
            owner_type,
            owner_id,
        })
    }

    /// Create without validation (internal use only)
    #[must_use]
    pub fn new_unchecked(owner_type: impl Into<String>, owner_id: i64) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id,
        }
    }

    fn validate(owner_type: &str) -> Result<()> {
        if owner_type.is_empty() {
            return Err(Error::invalid_owner("owner type must not be empty"));
        }
        if owner_type.contains('\0') {
            return Err(Error::invalid_owner(format!(
                "owner type {owner_type:?} contains a NUL byte"
            )));
        }
        Ok(())
    }
}

/// Tag recorded next to a value's text encoding
///
/// The tag names are part of the durable format and must not change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Double,
    String,
    Boolean,
    Array,
    Object,
    #[default]
    Null,
}

impl ValueType {
    /// All tags, in durable-format order
    pub const ALL: [Self; 7] = [
        Self::Integer,
        Self::Double,
        Self::String,
        Self::Boolean,
        Self::Array,
        Self::Object,
        Self::Null,
    ];

    /// Tag as stored in the `value_type` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    /// Look up a stored tag; unknown tags yield `None`
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s).ok_or_else(|| Error::configuration(format!("unknown value type: {s}")))
    }
}
