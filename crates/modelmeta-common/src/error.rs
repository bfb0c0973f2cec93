//! Error types shared across ModelMeta crates

use thiserror::Error;

/// Common result type for ModelMeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for ModelMeta
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid owner: {0}")]
    InvalidOwner(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid owner error
    pub fn invalid_owner(msg: impl Into<String>) -> Self {
        Self::InvalidOwner(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::invalid_owner("empty owner type").to_string(),
            "invalid owner: empty owner type"
        );
        assert_eq!(
            Error::configuration("bad path").to_string(),
            "configuration error: bad path"
        );
    }
}
