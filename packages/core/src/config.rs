//! Portable site configuration.
//!
//! [`SiteConfig`] is the shape a site takes in the site table, on the wire,
//! and in local static storage. Every field is optional: the same type
//! carries full snapshots and partial updates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::card::CardConfig;

/// Publication state of a site.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Draft => write!(f, "draft"),
            SiteStatus::Active => write!(f, "active"),
            SiteStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for SiteStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SiteStatus::Draft),
            "active" => Ok(SiteStatus::Active),
            "archived" => Ok(SiteStatus::Archived),
            _ => Err(format!(
                "unknown site status {s:?}; expected one of: draft, active, archived"
            )),
        }
    }
}

/// A custom hostname pointed at a site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomDomain {
    pub hostname: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// Names of the fields of [`SiteConfig`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SiteKey {
    SiteId,
    UserId,
    Title,
    ThemeId,
    SubDomain,
    CustomDomains,
    Status,
    UserConfig,
    Editor,
    Pages,
    Sections,
    ChangeId,
    CreatedAt,
    UpdatedAt,
}

impl SiteKey {
    pub const ALL: [SiteKey; 14] = [
        SiteKey::SiteId,
        SiteKey::UserId,
        SiteKey::Title,
        SiteKey::ThemeId,
        SiteKey::SubDomain,
        SiteKey::CustomDomains,
        SiteKey::Status,
        SiteKey::UserConfig,
        SiteKey::Editor,
        SiteKey::Pages,
        SiteKey::Sections,
        SiteKey::ChangeId,
        SiteKey::CreatedAt,
        SiteKey::UpdatedAt,
    ];
}

impl std::str::FromStr for SiteKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("unknown site key {s:?}"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,

    /// Owner of the site. Set by the server; ignored in client updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domains: Option<Vec<CustomDomain>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SiteStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Map<String, Value>>,

    /// Editor UI state. Shallow-merged rather than replaced on update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<CardConfig>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<BTreeMap<String, CardConfig>>,

    /// Opaque revision marker issued by the server on every accepted update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl SiteConfig {
    /// A config carrying only a site id.
    pub fn with_site_id(site_id: impl Into<String>) -> Self {
        Self {
            site_id: Some(site_id.into()),
            ..Default::default()
        }
    }

    /// Copy `key` from `src` into `self` when `src` has a value for it.
    pub fn copy_field(&mut self, src: &SiteConfig, key: SiteKey) {
        fn copy<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if let Some(v) = src {
                *dst = Some(v.clone());
            }
        }
        match key {
            SiteKey::SiteId => copy(&mut self.site_id, &src.site_id),
            SiteKey::UserId => copy(&mut self.user_id, &src.user_id),
            SiteKey::Title => copy(&mut self.title, &src.title),
            SiteKey::ThemeId => copy(&mut self.theme_id, &src.theme_id),
            SiteKey::SubDomain => copy(&mut self.sub_domain, &src.sub_domain),
            SiteKey::CustomDomains => copy(&mut self.custom_domains, &src.custom_domains),
            SiteKey::Status => copy(&mut self.status, &src.status),
            SiteKey::UserConfig => copy(&mut self.user_config, &src.user_config),
            SiteKey::Editor => copy(&mut self.editor, &src.editor),
            SiteKey::Pages => copy(&mut self.pages, &src.pages),
            SiteKey::Sections => copy(&mut self.sections, &src.sections),
            SiteKey::ChangeId => copy(&mut self.change_id, &src.change_id),
            SiteKey::CreatedAt => copy(&mut self.created_at, &src.created_at),
            SiteKey::UpdatedAt => copy(&mut self.updated_at, &src.updated_at),
        }
    }

    /// Overlay every field that `other` sets onto `self`.
    pub fn merge(&mut self, other: &SiteConfig) {
        for key in SiteKey::ALL {
            self.copy_field(other, key);
        }
    }

    /// A new config holding only the listed keys of `self`.
    pub fn pick(&self, keys: &[SiteKey]) -> SiteConfig {
        let mut out = SiteConfig::default();
        for key in keys {
            out.copy_field(self, *key);
        }
        out
    }
}
