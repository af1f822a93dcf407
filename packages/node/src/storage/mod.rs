//! Storage abstraction layer for the Siteframe server.
//!
//! The [`Storage`] trait is the contract between the built-in queries and
//! persistence. Ownership checks and field sanitising live in the queries;
//! storage only enforces uniqueness and the `changeId` check-and-set.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, throwaway servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use siteframe::SiteConfig;
use siteframe_api::User;

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// A unique key is already in use (site id, sub-domain, email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The `changeId` supplied with an update is not the stored one.
    #[error("stale change: {0}")]
    Stale(String),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// SiteUpdate
// ---------------------------------------------------------------------------

/// A sanitised update to a stored site.
///
/// Built by the `site` query after stripping server-controlled fields from
/// the client's payload.
#[derive(Debug, Clone)]
pub struct SiteUpdate {
    /// Fields to overlay on the stored config. `editor` is shallow-merged.
    pub fields: SiteConfig,

    /// When set, the update only applies if the stored `changeId` matches.
    pub expected_change_id: Option<String>,

    /// `changeId` to store once the update applies.
    pub change_id: String,

    /// RFC 3339 timestamp stored as `updatedAt`.
    pub updated_at: String,
}

impl SiteUpdate {
    /// Apply the update to `stored`, enforcing the `changeId` check.
    pub fn apply(&self, stored: &mut SiteConfig) -> Result<(), StorageError> {
        if let Some(expected) = &self.expected_change_id {
            if stored.change_id.as_ref() != Some(expected) {
                return Err(StorageError::Stale(format!(
                    "expected changeId {expected}, stored {}",
                    stored.change_id.as_deref().unwrap_or("none")
                )));
            }
        }

        let mut fields = self.fields.clone();
        if let Some(editor) = fields.editor.take() {
            stored.editor.get_or_insert_with(Default::default).extend(editor);
        }
        stored.merge(&fields);
        stored.change_id = Some(self.change_id.clone());
        stored.updated_at = Some(self.updated_at.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for a Siteframe server.
///
/// Implementations must be `Send + Sync + 'static` so they can be held in an
/// `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Users ---------------------------------------------------------------

    /// Register or update a user (upsert by `user_id`). Returns
    /// [`StorageError::Conflict`] if another user already has the email.
    async fn put_user(&self, user: &User) -> Result<(), StorageError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    // --- Sites ---------------------------------------------------------------

    /// Persist a new site. `site_id` must be set. Returns
    /// [`StorageError::Conflict`] on a duplicate id or sub-domain.
    async fn insert_site(&self, site: &SiteConfig) -> Result<(), StorageError>;

    async fn get_site(&self, site_id: &str) -> Result<Option<SiteConfig>, StorageError>;

    async fn get_site_by_sub_domain(
        &self,
        sub_domain: &str,
    ) -> Result<Option<SiteConfig>, StorageError>;

    /// Apply `update` atomically and return the stored result.
    ///
    /// Returns [`StorageError::NotFound`] for an unknown site,
    /// [`StorageError::Stale`] when the `changeId` check fails, and
    /// [`StorageError::Conflict`] when the new sub-domain is taken.
    async fn update_site(
        &self,
        site_id: &str,
        update: &SiteUpdate,
    ) -> Result<SiteConfig, StorageError>;

    /// Remove a site. Returns [`StorageError::NotFound`] if it does not exist.
    async fn delete_site(&self, site_id: &str) -> Result<(), StorageError>;

    /// All sites owned by `user_id`, ordered by `site_id`.
    async fn list_sites(&self, user_id: &str) -> Result<Vec<SiteConfig>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(expected: Option<&str>) -> SiteUpdate {
        SiteUpdate {
            fields: SiteConfig {
                title: Some("New".into()),
                editor: json!({ "panel": "pages" }).as_object().cloned(),
                ..Default::default()
            },
            expected_change_id: expected.map(str::to_string),
            change_id: "c2".into(),
            updated_at: "2026-01-02T00:00:00Z".into(),
        }
    }

    fn stored() -> SiteConfig {
        SiteConfig {
            site_id: Some("s1".into()),
            title: Some("Old".into()),
            editor: json!({ "zoom": 2 }).as_object().cloned(),
            change_id: Some("c1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn matching_change_id_applies() {
        let mut site = stored();
        update(Some("c1")).apply(&mut site).unwrap();
        assert_eq!(site.title.as_deref(), Some("New"));
        assert_eq!(site.change_id.as_deref(), Some("c2"));
        assert_eq!(
            serde_json::Value::Object(site.editor.unwrap()),
            json!({ "zoom": 2, "panel": "pages" })
        );
    }

    #[test]
    fn stale_change_id_is_rejected_untouched() {
        let mut site = stored();
        let err = update(Some("c0")).apply(&mut site).unwrap_err();
        assert!(matches!(err, StorageError::Stale(_)));
        assert_eq!(site, stored());
    }

    #[test]
    fn missing_change_id_skips_the_check() {
        let mut site = stored();
        update(None).apply(&mut site).unwrap();
        assert_eq!(site.change_id.as_deref(), Some("c2"));
    }
}
