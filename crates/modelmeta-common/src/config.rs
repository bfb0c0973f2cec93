//! Configuration types for ModelMeta
//!
//! The configuration is passed explicitly to the components that need it;
//! nothing here is process-global.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable prefix recognized by [`MetaConfig::load`]
pub const ENV_PREFIX: &str = "MODELMETA";

/// Root configuration for ModelMeta
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Stored type discriminator -> owner kind
    pub owner_type_map: OwnerTypeMap,
    /// Preload every record of an owner before serving a `get`
    pub preload_on_get: bool,
    /// Record store configuration
    pub store: StoreConfig,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            owner_type_map: OwnerTypeMap::default(),
            preload_on_get: true,
            store: StoreConfig::default(),
        }
    }
}

impl MetaConfig {
    /// Load configuration from an optional TOML file, then `MODELMETA__*`
    /// environment variables (e.g. `MODELMETA__PRELOAD_ON_GET=false`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Builder-style override of the preload policy
    #[must_use]
    pub fn with_preload_on_get(mut self, preload: bool) -> Self {
        self.preload_on_get = preload;
        self
    }

    /// Builder-style registration of a discriminator for an owner kind
    #[must_use]
    pub fn with_owner_type(mut self, discriminator: impl Into<String>, kind: impl Into<String>) -> Self {
        self.owner_type_map.insert(discriminator, kind);
        self
    }
}

/// Mapping from stored type discriminator to in-process owner kind
///
/// Decouples what is written to the `owner_type` column from the name of the
/// owning type. Kinds without an entry are stored under their raw name.
///
/// Serialized as a list of entries rather than a table: configuration
/// sources lowercase table keys, and discriminators are case-sensitive.
///
/// ```toml
/// [[owner_type_map]]
/// discriminator = "App\\Models\\Post"
/// kind = "app::Post"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<OwnerTypeEntry>", into = "Vec<OwnerTypeEntry>")]
pub struct OwnerTypeMap(BTreeMap<String, String>);

/// One `owner_type_map` entry as it appears in configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerTypeEntry {
    pub discriminator: String,
    pub kind: String,
}

impl From<Vec<OwnerTypeEntry>> for OwnerTypeMap {
    fn from(entries: Vec<OwnerTypeEntry>) -> Self {
        entries
            .into_iter()
            .map(|entry| (entry.discriminator, entry.kind))
            .collect()
    }
}

impl From<OwnerTypeMap> for Vec<OwnerTypeEntry> {
    fn from(map: OwnerTypeMap) -> Self {
        map.0
            .into_iter()
            .map(|(discriminator, kind)| OwnerTypeEntry {
                discriminator,
                kind,
            })
            .collect()
    }
}

impl OwnerTypeMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `discriminator` as the stored name of `kind`
    pub fn insert(&mut self, discriminator: impl Into<String>, kind: impl Into<String>) {
        self.0.insert(discriminator.into(), kind.into());
    }

    /// Stored discriminator for an owner kind, falling back to the kind itself
    #[must_use]
    pub fn discriminator_for<'a>(&'a self, kind: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|(_, k)| k.as_str() == kind)
            .map_or(kind, |(d, _)| d.as_str())
    }

    /// Owner kind for a stored discriminator, falling back to the discriminator
    #[must_use]
    pub fn kind_for<'a>(&'a self, discriminator: &'a str) -> &'a str {
        self.0.get(discriminator).map_or(discriminator, String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<D: Into<String>, K: Into<String>> FromIterator<(D, K)> for OwnerTypeMap {
    fn from_iter<I: IntoIterator<Item = (D, K)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(d, k)| (d.into(), k.into()))
                .collect(),
        )
    }
}

/// Record store configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the database file; `None` (the default) keeps the store in
    /// memory
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = MetaConfig::default();
        assert!(config.preload_on_get);
        assert!(config.owner_type_map.is_empty());
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_owner_type_map_fallback() {
        let map: OwnerTypeMap = [("posts", "app::Post"), ("videos", "app::Video")]
            .into_iter()
            .collect();

        assert_eq!(map.discriminator_for("app::Post"), "posts");
        assert_eq!(map.discriminator_for("app::Comment"), "app::Comment");
        assert_eq!(map.kind_for("videos"), "app::Video");
        assert_eq!(map.kind_for("comments"), "comments");
    }

    // Serializes tests that read or write MODELMETA__* variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("modelmeta.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_from_toml() {
        let _guard = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
preload_on_get = false

[[owner_type_map]]
discriminator = "posts"
kind = "app::Post"

[store]
path = "/tmp/meta.redb"
"#,
        );

        let config = MetaConfig::load(Some(&path)).unwrap();
        assert!(!config.preload_on_get);
        assert_eq!(config.owner_type_map.discriminator_for("app::Post"), "posts");
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/meta.redb")));
    }

    #[test]
    fn test_load_keeps_discriminator_case() {
        let _guard = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[[owner_type_map]]
discriminator = "BlogPost"
kind = "app::Post"

[[owner_type_map]]
discriminator = 'App\Models\Video'
kind = "app::Video"
"#,
        );

        let map = MetaConfig::load(Some(&path)).unwrap().owner_type_map;
        assert_eq!(map.len(), 2);
        assert_eq!(map.discriminator_for("app::Post"), "BlogPost");
        assert_eq!(map.discriminator_for("app::Video"), r"App\Models\Video");
        assert_eq!(map.kind_for("BlogPost"), "app::Post");
        assert_eq!(map.kind_for("blogpost"), "blogpost");
    }

    #[test]
    fn test_env_overrides_file() {
        let _guard = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "preload_on_get = true\n");

        // SAFETY: every test touching the process environment holds ENV_LOCK
        unsafe { std::env::set_var("MODELMETA__PRELOAD_ON_GET", "false") };
        let result = MetaConfig::load(Some(&path));
        unsafe { std::env::remove_var("MODELMETA__PRELOAD_ON_GET") };

        assert!(!result.unwrap().preload_on_get);
        assert!(MetaConfig::load(Some(&path)).unwrap().preload_on_get);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let _guard = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let result = MetaConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
