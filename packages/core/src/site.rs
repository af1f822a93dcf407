//! The live site aggregate.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use url::Url;

use crate::card::{set_pages, Card};
use crate::config::{CustomDomain, SiteConfig, SiteStatus};
use crate::reconcile::set_sections;
use crate::theme::Theme;

/// Errors raised while building a [`Site`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SiteError {
    #[error("no siteId")]
    MissingSiteId,
}

/// Runtime settings that are not part of the stored config.
#[derive(Debug, Clone, Default)]
pub struct SiteSettings {
    /// Static sites have no server-side row yet; saves go to local storage.
    pub is_static: bool,
    pub theme: Theme,
    pub urls: SiteUrls,
}

/// Where sites are served, per environment.
///
/// `live_url` and `local_url` are wildcard URLs such as
/// `https://*.siteframe.app`; the `*` is replaced by the site's sub-domain.
#[derive(Debug, Clone, Default)]
pub struct SiteUrls {
    pub live_url: String,
    pub local_url: String,
    /// Port of the local app server, used for non-production URLs.
    pub port: u16,
    pub is_prod: bool,
}

/// Which URL [`Site::display_url`] should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlMode {
    /// The public URL: the primary custom domain when there is one.
    Display,
    /// Always the sub-domain URL.
    Staging,
}

/// Sub-domain placeholder for sites that do not have one yet.
const NO_SUB_DOMAIN: &str = "NO_SUB_DOMAIN";

/// A site and its page/section tree, as held in memory.
#[derive(Debug, Clone)]
pub struct Site {
    pub site_id: String,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub theme_id: Option<String>,
    pub sub_domain: Option<String>,
    pub custom_domains: Vec<CustomDomain>,
    pub status: SiteStatus,
    pub user_config: Map<String, Value>,
    pub editor: Map<String, Value>,
    pub change_id: Option<String>,
    pub pages: Vec<Card>,
    pub sections: BTreeMap<String, Card>,
    pub settings: SiteSettings,
    revision: u64,
}

impl Site {
    /// Build a site from its stored config.
    ///
    /// Pages fall back to the theme's default pages. Sections are reconciled
    /// with the config's sections as overrides and the theme's sections as
    /// defaults.
    pub fn new(config: SiteConfig, settings: SiteSettings) -> Result<Self, SiteError> {
        let site_id = config
            .site_id
            .filter(|id| !id.is_empty())
            .ok_or(SiteError::MissingSiteId)?;

        let pages = config
            .pages
            .unwrap_or_else(|| settings.theme.pages.clone());
        let theme_sections = settings.theme.sections.clone();
        let theme_id = config
            .theme_id
            .or_else(|| Some(settings.theme.theme_id.clone()).filter(|id| !id.is_empty()));

        let mut site = Self {
            site_id,
            user_id: config.user_id,
            title: config.title,
            theme_id,
            sub_domain: config.sub_domain,
            custom_domains: config.custom_domains.unwrap_or_default(),
            status: config.status.unwrap_or_default(),
            user_config: config.user_config.unwrap_or_default(),
            editor: config.editor.unwrap_or_default(),
            change_id: config.change_id,
            pages: set_pages(pages),
            sections: BTreeMap::new(),
            settings,
            revision: 0,
        };
        set_sections(&mut site, config.sections.as_ref(), Some(&theme_sections));
        Ok(site)
    }

    /// Number of local updates applied since the site was built.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// The custom domain flagged primary, or the first one.
    pub fn primary_custom_domain(&self) -> Option<&str> {
        self.custom_domains
            .iter()
            .find(|d| d.is_primary)
            .or_else(|| self.custom_domains.first())
            .map(|d| d.hostname.as_str())
    }

    /// Hostname of the site's sub-domain URL in the current environment.
    ///
    /// Empty when the configured base URL is empty or does not parse.
    pub fn hostname(&self) -> String {
        let urls = &self.settings.urls;
        let base = if urls.is_prod { &urls.live_url } else { &urls.local_url };
        if urls.is_prod && !base.contains('*') {
            tracing::error!(live_url = %base, "live URL must include a wildcard (*)");
        }

        let sub = self
            .sub_domain
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_SUB_DOMAIN);
        let full = base.replacen('*', sub, 1);
        if full.is_empty() {
            return String::new();
        }

        match Url::parse(&full) {
            Ok(url) => url.host_str().unwrap_or_default().to_string(),
            Err(e) => {
                tracing::error!(url = %full, error = %e, "invalid site URL");
                String::new()
            }
        }
    }

    /// Base URL of the site, without a trailing slash.
    pub fn display_url(&self, mode: UrlMode) -> String {
        if mode == UrlMode::Display {
            if let Some(domain) = self.primary_custom_domain() {
                return format!("https://{domain}");
            }
        }

        let hostname = self.hostname();
        if self.settings.urls.is_prod {
            format!("https://{hostname}")
        } else {
            format!("http://{hostname}:{}", self.settings.urls.port)
        }
    }

    /// URL of an uploaded static file, served under `/__static/`.
    pub fn static_file_url(&self, filename: &str) -> String {
        format!("{}/__static/{filename}", self.display_url(UrlMode::Staging))
    }

    /// [`Site::static_file_url`] for several files, keyed by the camelCased
    /// file name without its extension (`hero-image.png` gives `heroImage`).
    pub fn static_file_urls(&self, filenames: &[&str]) -> BTreeMap<String, String> {
        let site_url = self.display_url(UrlMode::Staging);
        filenames
            .iter()
            .map(|filename| {
                (
                    camel_case(strip_extension(filename)),
                    format!("{site_url}/__static/{filename}"),
                )
            })
            .collect()
    }

    /// Full portable snapshot of the site.
    pub fn to_config(&self) -> SiteConfig {
        SiteConfig {
            site_id: Some(self.site_id.clone()),
            user_id: self.user_id.clone(),
            title: self.title.clone(),
            theme_id: self.theme_id.clone(),
            sub_domain: self.sub_domain.clone(),
            custom_domains: Some(self.custom_domains.clone()),
            status: Some(self.status),
            user_config: Some(self.user_config.clone()),
            editor: Some(self.editor.clone()),
            pages: Some(self.pages.iter().map(Card::to_config).collect()),
            sections: Some(
                self.sections
                    .iter()
                    .map(|(id, card)| (id.clone(), card.to_config()))
                    .collect(),
            ),
            change_id: self.change_id.clone(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// `name.ext` to `name`; only the last extension, never past a `/`.
fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(dot) if dot > 0 && !filename[dot..].contains('/') => &filename[..dot],
        _ => filename,
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | ' ') {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
