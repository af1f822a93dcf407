//! The `site` endpoint and its in-process [`SiteRemote`] adapter.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use siteframe::{RemoteError, SiteConfig, SiteRemote, SiteStatus};
use siteframe_api::{codes, Envelope, IndexMeta, ManageSiteParams, SiteWhere, User, UserRole};

use crate::error::QueryError;
use crate::query::{EndpointMeta, Query};
use crate::storage::{SiteUpdate, Storage, StorageError};

/// A single DNS label: lowercase alphanumerics and inner hyphens, 1-63 chars.
static SUB_DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("invalid sub-domain regex")
});

fn validate_sub_domain(sub_domain: &str) -> Result<(), QueryError> {
    if SUB_DOMAIN_RE.is_match(sub_domain) {
        Ok(())
    } else {
        Err(QueryError::exposed(
            codes::INVALID_SUB_DOMAIN,
            format!("{sub_domain:?} is not a valid sub-domain"),
        ))
    }
}

/// Storage conflicts from site writes are sub-domain clashes; ids are fresh
/// UUIDv7s.
fn map_write_err(e: StorageError) -> QueryError {
    match e {
        StorageError::Conflict(_) => {
            QueryError::exposed(codes::SUB_DOMAIN_TAKEN, "that sub-domain is already taken")
        }
        other => other.into(),
    }
}

/// Payload of a `site` response: one site, or the sites of a `list`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SiteView {
    One(SiteConfig),
    Many(Vec<SiteConfig>),
}

impl SiteView {
    pub fn single(self) -> Option<SiteConfig> {
        match self {
            SiteView::One(site) => Some(site),
            SiteView::Many(_) => None,
        }
    }
}

/// Create, read, update, list, and delete sites.
///
/// HTTP callers must be logged in to write, and may only touch sites they
/// own unless they are an admin. In-process callers (`meta.server`) skip both
/// checks. Every accepted update issues a new `changeId`; an update carrying
/// an outdated one is rejected with `STALE_CHANGE`.
pub struct ManageSite {
    storage: Arc<dyn Storage>,
}

impl ManageSite {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The caller, or `None` for in-process calls.
    fn caller<'m>(meta: &'m EndpointMeta) -> Result<Option<&'m User>, QueryError> {
        if meta.server {
            Ok(None)
        } else {
            meta.require_bearer().map(Some)
        }
    }

    fn check_owner(site: &SiteConfig, caller: Option<&User>) -> Result<(), QueryError> {
        match caller {
            Some(user)
                if user.role != UserRole::Admin
                    && site.user_id.as_deref() != Some(user.user_id.as_str()) =>
            {
                Err(QueryError::exposed(codes::FORBIDDEN, "you do not own this site"))
            }
            _ => Ok(()),
        }
    }

    async fn find(&self, selector: &SiteWhere) -> Result<SiteConfig, QueryError> {
        let found = match (&selector.site_id, &selector.sub_domain) {
            (Some(site_id), _) => self.storage.get_site(site_id).await?,
            (None, Some(sub_domain)) => self.storage.get_site_by_sub_domain(sub_domain).await?,
            (None, None) => {
                return Err(QueryError::exposed(
                    codes::INVALID_PARAMS,
                    "where must include siteId or subDomain",
                ))
            }
        };
        found.ok_or_else(|| QueryError::exposed(codes::NOT_FOUND, "site not found"))
    }

    async fn create(
        &self,
        mut fields: SiteConfig,
        meta: &EndpointMeta,
    ) -> Result<Envelope<SiteView>, QueryError> {
        let caller = Self::caller(meta)?;

        if let Some(sub_domain) = &fields.sub_domain {
            validate_sub_domain(sub_domain)?;
        }

        // In-process callers may assign an owner; everyone else owns what
        // they create.
        if let Some(user) = caller {
            fields.user_id = Some(user.user_id.clone());
        }
        let now = super::now_rfc3339();
        fields.site_id = Some(uuid::Uuid::now_v7().to_string());
        fields.change_id = Some(uuid::Uuid::now_v7().to_string());
        fields.created_at = Some(now.clone());
        fields.updated_at = Some(now);
        fields.status.get_or_insert(SiteStatus::Draft);

        self.storage.insert_site(&fields).await.map_err(map_write_err)?;
        tracing::info!(site_id = ?fields.site_id, sub_domain = ?fields.sub_domain, "site created");

        Ok(Envelope::success(SiteView::One(fields)).with_message("site created"))
    }

    async fn update(
        &self,
        selector: &SiteWhere,
        mut fields: SiteConfig,
        meta: &EndpointMeta,
    ) -> Result<Envelope<SiteView>, QueryError> {
        let caller = Self::caller(meta)?;
        let site = self.find(selector).await?;
        Self::check_owner(&site, caller)?;

        let site_id = site
            .site_id
            .ok_or_else(|| QueryError::Internal("stored site has no siteId".into()))?;

        if let Some(sub_domain) = &fields.sub_domain {
            validate_sub_domain(sub_domain)?;
        }

        fields.site_id = None;
        fields.user_id = None;
        fields.created_at = None;
        fields.updated_at = None;
        let expected_change_id = fields.change_id.take();

        let update = SiteUpdate {
            fields,
            expected_change_id,
            change_id: uuid::Uuid::now_v7().to_string(),
            updated_at: super::now_rfc3339(),
        };

        let stored = match self.storage.update_site(&site_id, &update).await {
            Ok(stored) => stored,
            Err(StorageError::Stale(detail)) => {
                tracing::warn!(site_id = %site_id, %detail, "rejected stale site update");
                return Err(QueryError::exposed(
                    codes::STALE_CHANGE,
                    "site was changed elsewhere; reload and try again",
                ));
            }
            Err(e) => return Err(map_write_err(e)),
        };

        Ok(Envelope::success(SiteView::One(stored)).with_message("site saved"))
    }

    async fn delete(
        &self,
        selector: &SiteWhere,
        meta: &EndpointMeta,
    ) -> Result<Envelope<SiteView>, QueryError> {
        let caller = Self::caller(meta)?;
        let site = self.find(selector).await?;
        Self::check_owner(&site, caller)?;

        if let Some(site_id) = &site.site_id {
            self.storage.delete_site(site_id).await?;
            tracing::info!(site_id = %site_id, "site deleted");
        }

        Ok(Envelope::success(SiteView::One(site)).with_message("site deleted"))
    }

    /// Sites owned by `user_id`. Members may only list their own; the caller
    /// is the default owner.
    async fn list(
        &self,
        user_id: Option<String>,
        meta: &EndpointMeta,
    ) -> Result<Envelope<SiteView>, QueryError> {
        let owner = match (user_id, Self::caller(meta)?) {
            (Some(user_id), Some(user))
                if user.role != UserRole::Admin && user_id != user.user_id =>
            {
                return Err(QueryError::exposed(
                    codes::FORBIDDEN,
                    "you may only list your own sites",
                ))
            }
            (Some(user_id), _) => user_id,
            (None, Some(user)) => user.user_id.clone(),
            (None, None) => {
                return Err(QueryError::exposed(codes::INVALID_PARAMS, "userId is required"))
            }
        };

        let sites = self.storage.list_sites(&owner).await?;
        let index_meta = IndexMeta {
            count: Some(sites.len() as u64),
            ..Default::default()
        };
        Ok(Envelope::success(SiteView::Many(sites)).with_index_meta(index_meta))
    }
}

#[async_trait]
impl Query for ManageSite {
    type Params = ManageSiteParams;
    type Output = SiteView;

    async fn run(
        &self,
        params: ManageSiteParams,
        meta: &EndpointMeta,
    ) -> Result<Envelope<SiteView>, QueryError> {
        match params {
            ManageSiteParams::Create { fields } => self.create(fields, meta).await,
            // Sites are public documents; anyone may read one to render it.
            ManageSiteParams::Retrieve { selector } => {
                Ok(Envelope::success(SiteView::One(self.find(&selector).await?)))
            }
            ManageSiteParams::Update { selector, fields } => {
                self.update(&selector, fields, meta).await
            }
            ManageSiteParams::Delete { selector } => self.delete(&selector, meta).await,
            ManageSiteParams::List { user_id } => self.list(user_id, meta).await,
        }
    }
}

// ---------------------------------------------------------------------------
// InProcessSiteRemote
// ---------------------------------------------------------------------------

/// Saves a [`SiteHandle`](siteframe::SiteHandle) through [`ManageSite`]
/// without going over HTTP.
pub struct InProcessSiteRemote {
    query: Arc<ManageSite>,
    meta: EndpointMeta,
}

impl InProcessSiteRemote {
    pub fn new(query: Arc<ManageSite>, meta: EndpointMeta) -> Self {
        Self { query, meta }
    }
}

#[async_trait]
impl SiteRemote for InProcessSiteRemote {
    async fn update(
        &self,
        site_id: &str,
        fields: SiteConfig,
    ) -> Result<Option<SiteConfig>, RemoteError> {
        let params = ManageSiteParams::Update {
            selector: SiteWhere::site_id(site_id),
            fields,
        };
        match self.query.run(params, &self.meta).await {
            Ok(envelope) => Ok(envelope.data.and_then(SiteView::single)),
            Err(err) => Err(RemoteError::Rejected {
                code: err.code().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteframe::{save_site, MemoryLocalStore, SaveOptions, Site, SiteHandle, SiteSettings};

    use crate::storage::memory::MemoryStorage;

    fn user(id: &str, role: UserRole) -> User {
        User {
            user_id: id.into(),
            email: format!("{id}@example.com"),
            full_name: None,
            role,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn query() -> Arc<ManageSite> {
        Arc::new(ManageSite::new(Arc::new(MemoryStorage::new())))
    }

    async fn create(q: &ManageSite, owner: &User, sub_domain: &str) -> SiteConfig {
        q.run(
            ManageSiteParams::Create {
                fields: SiteConfig {
                    title: Some("Acme".into()),
                    sub_domain: Some(sub_domain.into()),
                    ..Default::default()
                },
            },
            &EndpointMeta::for_user(owner.clone()),
        )
        .await
        .unwrap()
        .data
        .and_then(SiteView::single)
        .unwrap()
    }

    fn update(site_id: &str, fields: SiteConfig) -> ManageSiteParams {
        ManageSiteParams::Update {
            selector: SiteWhere::site_id(site_id),
            fields,
        }
    }

    #[tokio::test]
    async fn create_assigns_server_fields() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        let site = create(&q, &ada, "acme").await;

        assert!(site.site_id.is_some());
        assert!(site.change_id.is_some());
        assert_eq!(site.user_id.as_deref(), Some("ada"));
        assert_eq!(site.status, Some(SiteStatus::Draft));
    }

    #[tokio::test]
    async fn anonymous_writes_are_refused() {
        let q = query();
        let err = q
            .run(
                ManageSiteParams::Create {
                    fields: SiteConfig::default(),
                },
                &EndpointMeta::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_and_taken_sub_domains() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        create(&q, &ada, "acme").await;

        let meta = EndpointMeta::for_user(ada);
        for (sub_domain, code) in [
            ("Acme", codes::INVALID_SUB_DOMAIN),
            ("-acme", codes::INVALID_SUB_DOMAIN),
            ("acme", codes::SUB_DOMAIN_TAKEN),
        ] {
            let err = q
                .run(
                    ManageSiteParams::Create {
                        fields: SiteConfig {
                            sub_domain: Some(sub_domain.into()),
                            ..Default::default()
                        },
                    },
                    &meta,
                )
                .await
                .unwrap_err();
            assert_eq!(err.code(), code, "{sub_domain}");
        }
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_update() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        let site = create(&q, &ada, "acme").await;
        let site_id = site.site_id.clone().unwrap();

        let retitle = SiteConfig {
            title: Some("Mine now".into()),
            ..Default::default()
        };

        let err = q
            .run(
                update(&site_id, retitle.clone()),
                &EndpointMeta::for_user(user("bob", UserRole::Member)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::FORBIDDEN);

        let env = q
            .run(
                update(&site_id, retitle),
                &EndpointMeta::for_user(user("root", UserRole::Admin)),
            )
            .await
            .unwrap();
        assert_eq!(env.data.and_then(SiteView::single).unwrap().title.as_deref(), Some("Mine now"));
    }

    #[tokio::test]
    async fn server_controlled_fields_are_ignored() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        let site = create(&q, &ada, "acme").await;
        let site_id = site.site_id.clone().unwrap();

        let env = q
            .run(
                update(
                    &site_id,
                    SiteConfig {
                        site_id: Some("hijack".into()),
                        user_id: Some("bob".into()),
                        created_at: Some("1970-01-01T00:00:00Z".into()),
                        ..Default::default()
                    },
                ),
                &EndpointMeta::for_user(ada),
            )
            .await
            .unwrap();
        let stored = env.data.and_then(SiteView::single).unwrap();
        assert_eq!(stored.site_id.as_deref(), Some(site_id.as_str()));
        assert_eq!(stored.user_id.as_deref(), Some("ada"));
        assert_eq!(stored.created_at, site.created_at);
    }

    #[tokio::test]
    async fn stale_change_id_is_rejected() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        let site = create(&q, &ada, "acme").await;
        let site_id = site.site_id.clone().unwrap();
        let meta = EndpointMeta::for_user(ada);

        let edit = |title: &str| SiteConfig {
            title: Some(title.into()),
            change_id: site.change_id.clone(),
            ..Default::default()
        };

        let first = q.run(update(&site_id, edit("first")), &meta).await.unwrap();
        assert_ne!(first.data.and_then(SiteView::single).unwrap().change_id, site.change_id);

        let err = q.run(update(&site_id, edit("second")), &meta).await.unwrap_err();
        assert_eq!(err.code(), codes::STALE_CHANGE);
        assert_eq!(err.into_envelope().expose, Some(true));
    }

    #[tokio::test]
    async fn retrieve_by_sub_domain_and_delete() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        create(&q, &ada, "acme").await;

        let env = q
            .run(
                ManageSiteParams::Retrieve {
                    selector: SiteWhere::sub_domain("acme"),
                },
                &EndpointMeta::default(),
            )
            .await
            .unwrap();
        assert_eq!(env.data.and_then(SiteView::single).unwrap().title.as_deref(), Some("Acme"));

        q.run(
            ManageSiteParams::Delete {
                selector: SiteWhere::sub_domain("acme"),
            },
            &EndpointMeta::for_user(ada),
        )
        .await
        .unwrap();

        let err = q
            .run(
                ManageSiteParams::Retrieve {
                    selector: SiteWhere::sub_domain("acme"),
                },
                &EndpointMeta::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_owned_sites() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        create(&q, &ada, "acme").await;
        create(&q, &ada, "acme-blog").await;
        create(&q, &user("bob", UserRole::Member), "bobs").await;

        let env = q
            .run(
                ManageSiteParams::List { user_id: None },
                &EndpointMeta::for_user(ada.clone()),
            )
            .await
            .unwrap();
        assert_eq!(env.index_meta.and_then(|m| m.count), Some(2));
        match env.data {
            Some(SiteView::Many(sites)) => assert!(sites
                .iter()
                .all(|s| s.user_id.as_deref() == Some("ada"))),
            other => panic!("unexpected payload: {other:?}"),
        }

        let err = q
            .run(
                ManageSiteParams::List {
                    user_id: Some("bob".into()),
                },
                &EndpointMeta::for_user(ada),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::FORBIDDEN);

        let env = q
            .run(
                ManageSiteParams::List {
                    user_id: Some("bob".into()),
                },
                &EndpointMeta::server(),
            )
            .await
            .unwrap();
        assert_eq!(env.index_meta.and_then(|m| m.count), Some(1));
    }

    #[tokio::test]
    async fn site_handle_saves_in_process() {
        let q = query();
        let ada = user("ada", UserRole::Member);
        let created = create(&q, &ada, "acme").await;

        let site = Site::new(created.clone(), SiteSettings::default()).unwrap();
        let handle = SiteHandle::new(site);
        handle.update(SiteConfig {
            title: Some("Renamed".into()),
            ..Default::default()
        });

        let remote = InProcessSiteRemote::new(Arc::clone(&q), EndpointMeta::for_user(ada));
        let stored = save_site(&handle, &remote, &MemoryLocalStore::new(), SaveOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored.title.as_deref(), Some("Renamed"));
        assert_ne!(stored.change_id, created.change_id);
        handle.read(|site| assert_eq!(site.change_id, stored.change_id));

        // The handle now carries the fresh changeId, so a second save succeeds.
        save_site(&handle, &remote, &MemoryLocalStore::new(), SaveOptions::default())
            .await
            .unwrap();
    }
}
