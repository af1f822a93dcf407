//! Local key-value storage for static (not yet persisted) sites.
//!
//! Static sites keep their config under the key `static-{siteId}` as a JSON
//! object. Writes merge into whatever is already stored.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::SiteConfig;

#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    #[error("local storage error: {0}")]
    Io(String),

    #[error("invalid local storage key: {0:?}")]
    InvalidKey(String),

    #[error("invalid stored site config: {0}")]
    Json(#[from] serde_json::Error),
}

/// A string key-value store.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;
}

/// In-memory [`LocalStore`]. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage key for a static site's config.
pub fn static_key(site_id: &str) -> String {
    format!("static-{site_id}")
}

/// Read the stored config of a static site, merging `fields` into it first
/// when given.
///
/// A site that has never been stored reads as an empty config.
pub fn local_site_config(
    store: &dyn LocalStore,
    site_id: &str,
    fields: Option<&SiteConfig>,
) -> Result<SiteConfig, LocalStoreError> {
    let key = static_key(site_id);
    let mut config: SiteConfig = match store.get(&key)? {
        Some(raw) => serde_json::from_str(&raw)?,
        None => SiteConfig::default(),
    };

    if let Some(fields) = fields {
        config.merge(fields);
        store.set(&key, &serde_json::to_string(&config)?)?;
    }

    Ok(config)
}
