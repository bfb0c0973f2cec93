//! ModelMeta Common - Shared types and configuration
//!
//! This crate provides the owner reference and value-type tag shared by the
//! record store and the metadata engine, plus the configuration surface.

pub mod config;
pub mod error;
pub mod types;

pub use config::{MetaConfig, OwnerTypeEntry, OwnerTypeMap, StoreConfig};
pub use error::{Error, Result};
pub use types::*;
