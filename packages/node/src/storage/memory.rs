//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and throwaway servers.
//!
//! Sites are kept in a [`BTreeMap`] keyed by their UUIDv7 id, so listing
//! returns them in creation order without a secondary index.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use siteframe::SiteConfig;
use siteframe_api::User;

use super::{SiteUpdate, Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    sites: BTreeMap<String, SiteConfig>,
}

impl Inner {
    fn sub_domain_owner(&self, sub_domain: &str) -> Option<&str> {
        self.sites
            .values()
            .find(|s| s.sub_domain.as_deref() == Some(sub_domain))
            .and_then(|s| s.site_id.as_deref())
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Users ---------------------------------------------------------------

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        let mut inner = self.write();
        let taken = inner
            .users
            .values()
            .any(|u| u.email == user.email && u.user_id != user.user_id);
        if taken {
            return Err(StorageError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        inner.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        Ok(self.read().users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(self.read().users.values().find(|u| u.email == email).cloned())
    }

    // --- Sites ---------------------------------------------------------------

    async fn insert_site(&self, site: &SiteConfig) -> Result<(), StorageError> {
        let site_id = site
            .site_id
            .clone()
            .ok_or_else(|| StorageError::Internal("site has no siteId".into()))?;

        let mut inner = self.write();
        if inner.sites.contains_key(&site_id) {
            return Err(StorageError::Conflict(format!("site {site_id} already exists")));
        }
        if let Some(sub_domain) = &site.sub_domain {
            if inner.sub_domain_owner(sub_domain).is_some() {
                return Err(StorageError::Conflict(format!(
                    "sub-domain {sub_domain} is taken"
                )));
            }
        }
        inner.sites.insert(site_id, site.clone());
        Ok(())
    }

    async fn get_site(&self, site_id: &str) -> Result<Option<SiteConfig>, StorageError> {
        Ok(self.read().sites.get(site_id).cloned())
    }

    async fn get_site_by_sub_domain(
        &self,
        sub_domain: &str,
    ) -> Result<Option<SiteConfig>, StorageError> {
        Ok(self
            .read()
            .sites
            .values()
            .find(|s| s.sub_domain.as_deref() == Some(sub_domain))
            .cloned())
    }

    async fn update_site(
        &self,
        site_id: &str,
        update: &SiteUpdate,
    ) -> Result<SiteConfig, StorageError> {
        let mut inner = self.write();

        if let Some(sub_domain) = &update.fields.sub_domain {
            if let Some(owner) = inner.sub_domain_owner(sub_domain) {
                if owner != site_id {
                    return Err(StorageError::Conflict(format!(
                        "sub-domain {sub_domain} is taken"
                    )));
                }
            }
        }

        let stored = inner.sites.get_mut(site_id).ok_or(StorageError::NotFound)?;
        let mut next = stored.clone();
        update.apply(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete_site(&self, site_id: &str) -> Result<(), StorageError> {
        self.write()
            .sites
            .remove(site_id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn list_sites(&self, user_id: &str) -> Result<Vec<SiteConfig>, StorageError> {
        Ok(self
            .read()
            .sites
            .values()
            .filter(|s| s.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use siteframe_api::UserRole;

    fn user(id: &str, email: &str) -> User {
        User {
            user_id: id.into(),
            email: email.into(),
            full_name: None,
            role: UserRole::Member,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn site(id: &str, sub_domain: &str) -> SiteConfig {
        SiteConfig {
            site_id: Some(id.into()),
            user_id: Some("u1".into()),
            sub_domain: Some(sub_domain.into()),
            change_id: Some("c1".into()),
            ..Default::default()
        }
    }

    fn retitle(expected: &str, change_id: &str) -> SiteUpdate {
        SiteUpdate {
            fields: SiteConfig {
                title: Some("Retitled".into()),
                ..Default::default()
            },
            expected_change_id: Some(expected.into()),
            change_id: change_id.into(),
            updated_at: "2026-01-02T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn user_lookup_by_email() {
        let s = MemoryStorage::new();
        s.put_user(&user("u1", "ada@example.com")).await.unwrap();
        let got = s.get_user_by_email("ada@example.com").await.unwrap();
        assert_eq!(got.unwrap().user_id, "u1");
        assert!(s.get_user_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let s = MemoryStorage::new();
        s.put_user(&user("u1", "ada@example.com")).await.unwrap();
        let err = s.put_user(&user("u2", "ada@example.com")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        // Re-putting the same user is an upsert.
        s.put_user(&user("u1", "ada@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn sub_domain_is_unique() {
        let s = MemoryStorage::new();
        s.insert_site(&site("s1", "acme")).await.unwrap();
        let err = s.insert_site(&site("s2", "acme")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        s.insert_site(&site("s2", "other")).await.unwrap();
        let steal = SiteUpdate {
            fields: SiteConfig {
                sub_domain: Some("acme".into()),
                ..Default::default()
            },
            expected_change_id: None,
            change_id: "c9".into(),
            updated_at: "2026-01-02T00:00:00Z".into(),
        };
        let err = s.update_site("s2", &steal).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn second_writer_with_old_change_id_is_stale() {
        let s = MemoryStorage::new();
        s.insert_site(&site("s1", "acme")).await.unwrap();

        let first = s.update_site("s1", &retitle("c1", "c2")).await.unwrap();
        assert_eq!(first.change_id.as_deref(), Some("c2"));

        let err = s.update_site("s1", &retitle("c1", "c3")).await.unwrap_err();
        assert!(matches!(err, StorageError::Stale(_)));
        let stored = s.get_site("s1").await.unwrap().unwrap();
        assert_eq!(stored.change_id.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn delete_and_list() {
        let s = MemoryStorage::new();
        s.insert_site(&site("s1", "a")).await.unwrap();
        s.insert_site(&site("s2", "b")).await.unwrap();
        assert_eq!(s.list_sites("u1").await.unwrap().len(), 2);

        s.delete_site("s1").await.unwrap();
        assert!(matches!(
            s.delete_site("s1").await.unwrap_err(),
            StorageError::NotFound
        ));
        assert_eq!(s.list_sites("u1").await.unwrap().len(), 1);
    }
}
