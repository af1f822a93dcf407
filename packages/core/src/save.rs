//! Shared site handle and the save flow.
//!
//! A [`SiteHandle`] is the single owner of a live [`Site`]. Every mutation
//! goes through it, and the lock is never held across a remote call.
//!
//! [`save_site`] persists a site either to local static storage or through a
//! [`SiteRemote`]. The config the remote returns is fed back through
//! [`update_site`] so the local tree matches what the server stored. If the
//! site was updated locally while the save was in flight, only the server's
//! `changeId` is adopted so newer local edits are not overwritten.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::config::{SiteConfig, SiteKey};
use crate::local::{local_site_config, LocalStore, LocalStoreError};
use crate::reconcile::{set_sections, update_site, SectionMap};
use crate::site::Site;

/// Failure reported by a [`SiteRemote`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an error envelope.
    #[error("{message} ({code})")]
    Rejected { code: String, message: String },
}

/// Remote persistence of site configuration.
#[async_trait]
pub trait SiteRemote: Send + Sync {
    /// Persist `fields` for `site_id`, returning the stored config.
    async fn update(
        &self,
        site_id: &str,
        fields: SiteConfig,
    ) -> Result<Option<SiteConfig>, RemoteError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("no siteId")]
    MissingSiteId,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Local(#[from] LocalStoreError),
}

/// Options for [`save_site`].
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Save only these keys (plus `siteId`). `None` saves the full config.
    pub only_keys: Option<Vec<SiteKey>>,

    /// Fields applied on top of the payload, typically edits that were held
    /// back until save time.
    pub delay_until_save_config: Option<SiteConfig>,
}

/// Shared, lock-protected handle to a live site.
#[derive(Debug, Clone)]
pub struct SiteHandle {
    inner: Arc<RwLock<Site>>,
}

impl SiteHandle {
    pub fn new(site: Site) -> Self {
        Self {
            inner: Arc::new(RwLock::new(site)),
        }
    }

    /// Run `f` with shared access to the site.
    pub fn read<R>(&self, f: impl FnOnce(&Site) -> R) -> R {
        let site = self.inner.read().unwrap_or_else(|p| p.into_inner());
        f(&site)
    }

    /// Run `f` with exclusive access to the site.
    pub fn write<R>(&self, f: impl FnOnce(&mut Site) -> R) -> R {
        let mut site = self.inner.write().unwrap_or_else(|p| p.into_inner());
        f(&mut site)
    }

    /// [`update_site`] through the handle.
    pub fn update(&self, new_config: SiteConfig) {
        self.write(|site| update_site(site, new_config));
    }

    /// [`set_sections`] through the handle.
    pub fn set_sections(&self, supplied: Option<&SectionMap>, theme: Option<&SectionMap>) {
        self.write(|site| set_sections(site, supplied, theme));
    }

    pub fn snapshot(&self) -> SiteConfig {
        self.read(Site::to_config)
    }
}

/// Persist the site and reconcile the live tree with the stored result.
///
/// Returns the stored config: the merged local entry for static sites, or
/// whatever the remote returned.
pub async fn save_site(
    handle: &SiteHandle,
    remote: &dyn SiteRemote,
    local: &dyn LocalStore,
    options: SaveOptions,
) -> Result<Option<SiteConfig>, SaveError> {
    let (config, revision, is_static) =
        handle.read(|site| (site.to_config(), site.revision(), site.settings.is_static));

    let site_id = config
        .site_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or(SaveError::MissingSiteId)?;

    let mut fields = match &options.only_keys {
        Some(keys) => {
            let mut picked = config.pick(keys);
            picked.site_id = Some(site_id.clone());
            picked
        }
        None => config,
    };

    if let Some(delayed) = &options.delay_until_save_config {
        fields.merge(delayed);
    }

    if is_static {
        let stored = local_site_config(local, &site_id, Some(&fields))?;
        tracing::debug!(site_id = %site_id, "saved static site locally");
        return Ok(Some(stored));
    }

    let stored = remote.update(&site_id, fields).await?;

    if let Some(stored) = &stored {
        handle.write(|site| {
            if site.revision() == revision {
                update_site(site, stored.clone());
            } else {
                tracing::warn!(
                    site_id = %site_id,
                    "site changed while saving; keeping local edits and adopting changeId only"
                );
                update_site(
                    site,
                    SiteConfig {
                        change_id: stored.change_id.clone(),
                        ..Default::default()
                    },
                );
            }
        });
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::local::MemoryLocalStore;
    use crate::site::SiteSettings;

    /// Records the last payload and answers with it plus a fresh changeId.
    #[derive(Default)]
    struct EchoRemote {
        last: Mutex<Option<SiteConfig>>,
        handle: Mutex<Option<SiteHandle>>,
    }

    #[async_trait]
    impl SiteRemote for EchoRemote {
        async fn update(
            &self,
            _site_id: &str,
            fields: SiteConfig,
        ) -> Result<Option<SiteConfig>, RemoteError> {
            *self.last.lock().unwrap() = Some(fields.clone());
            // Simulate a concurrent local edit landing mid-flight.
            if let Some(handle) = self.handle.lock().unwrap().take() {
                handle.update(SiteConfig {
                    title: Some("edited while saving".into()),
                    ..Default::default()
                });
            }
            let mut stored = fields;
            stored.change_id = Some("c2".into());
            stored.title = Some(format!("{} (saved)", stored.title.unwrap_or_default()));
            Ok(Some(stored))
        }
    }

    struct FailingRemote;

    #[async_trait]
    impl SiteRemote for FailingRemote {
        async fn update(
            &self,
            _site_id: &str,
            _fields: SiteConfig,
        ) -> Result<Option<SiteConfig>, RemoteError> {
            Err(RemoteError::Rejected {
                code: "STALE_CHANGE".into(),
                message: "site was changed elsewhere".into(),
            })
        }
    }

    fn handle(is_static: bool) -> SiteHandle {
        let site = Site::new(
            SiteConfig {
                site_id: Some("s1".into()),
                title: Some("Home".into()),
                sub_domain: Some("acme".into()),
                change_id: Some("c1".into()),
                ..Default::default()
            },
            SiteSettings {
                is_static,
                ..Default::default()
            },
        )
        .unwrap();
        SiteHandle::new(site)
    }

    #[tokio::test]
    async fn remote_result_is_reconciled_into_the_tree() {
        let handle = handle(false);
        let remote = EchoRemote::default();
        let local = MemoryLocalStore::new();

        let stored = save_site(&handle, &remote, &local, SaveOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored.change_id.as_deref(), Some("c2"));
        handle.read(|site| {
            assert_eq!(site.change_id.as_deref(), Some("c2"));
            assert_eq!(site.title.as_deref(), Some("Home (saved)"));
        });
    }

    #[tokio::test]
    async fn only_keys_limit_the_payload() {
        let handle = handle(false);
        let remote = EchoRemote::default();
        let local = MemoryLocalStore::new();
        let options = SaveOptions {
            only_keys: Some(vec![SiteKey::Title]),
            delay_until_save_config: Some(SiteConfig {
                status: Some(crate::SiteStatus::Active),
                ..Default::default()
            }),
        };

        save_site(&handle, &remote, &local, options).await.unwrap();

        let sent = remote.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.site_id.as_deref(), Some("s1"));
        assert_eq!(sent.title.as_deref(), Some("Home"));
        assert_eq!(sent.status, Some(crate::SiteStatus::Active));
        assert!(sent.sub_domain.is_none());
        assert!(sent.pages.is_none());
    }

    #[tokio::test]
    async fn static_sites_save_locally() {
        let handle = handle(true);
        let remote = FailingRemote;
        let local = MemoryLocalStore::new();

        let stored = save_site(&handle, &remote, &local, SaveOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored.title.as_deref(), Some("Home"));
        assert!(local.get("static-s1").unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_local_edit_is_not_overwritten() {
        let handle = handle(false);
        let remote = EchoRemote::default();
        *remote.handle.lock().unwrap() = Some(handle.clone());
        let local = MemoryLocalStore::new();

        save_site(&handle, &remote, &local, SaveOptions::default())
            .await
            .unwrap();

        handle.read(|site| {
            assert_eq!(site.title.as_deref(), Some("edited while saving"));
            assert_eq!(site.change_id.as_deref(), Some("c2"));
        });
    }

    #[tokio::test]
    async fn cleared_site_id_is_refused_before_any_write() {
        let handle = handle(false);
        handle.write(|site| site.site_id = String::new());
        let remote = EchoRemote::default();
        let local = MemoryLocalStore::new();

        let err = save_site(&handle, &remote, &local, SaveOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SaveError::MissingSiteId));
        assert!(remote.last.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn remote_rejection_leaves_site_untouched() {
        let handle = handle(false);
        let local = MemoryLocalStore::new();

        let err = save_site(&handle, &FailingRemote, &local, SaveOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SaveError::Remote(RemoteError::Rejected { .. })));
        handle.read(|site| assert_eq!(site.change_id.as_deref(), Some("c1")));
    }
}
