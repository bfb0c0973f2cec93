//! Metadata engine error types

use modelmeta_store::MetaStoreError;
use thiserror::Error;

/// Result type for metadata operations
pub type MetaResult<T> = std::result::Result<T, MetaError>;

/// Errors raised by the metadata engine
///
/// Argument errors are raised before any cache or store mutation. Commit
/// failures are not errors: they surface as a `false` return.
#[derive(Debug, Error)]
pub enum MetaError {
    /// A key argument is neither a string nor a sequence of strings
    #[error("invalid key type: {0}")]
    InvalidKeyType(String),

    /// A batch payload is not a mapping of string keys to values
    #[error("invalid values shape: {0}")]
    InvalidValuesShape(String),

    #[error("store error: {0}")]
    Store(#[from] MetaStoreError),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("object type mismatch: stored {stored}, requested {requested}")]
    ObjectTypeMismatch { stored: String, requested: String },

    #[error(transparent)]
    Config(#[from] modelmeta_common::Error),
}

impl MetaError {
    pub fn invalid_key_type(msg: impl Into<String>) -> Self {
        Self::InvalidKeyType(msg.into())
    }

    pub fn invalid_values_shape(msg: impl Into<String>) -> Self {
        Self::InvalidValuesShape(msg.into())
    }

    /// Check if this is an argument validation error
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidKeyType(_) | Self::InvalidValuesShape(_))
    }
}

impl From<bincode::Error> for MetaError {
    fn from(e: bincode::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<serde_json::Error> for MetaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<base64::DecodeError> for MetaError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Codec(e.to_string())
    }
}
