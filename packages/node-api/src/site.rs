//! Params of the `site` endpoint.

use serde::{Deserialize, Serialize};
use siteframe::SiteConfig;

/// Selects one site, by id or by sub-domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteWhere {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_domain: Option<String>,
}

impl SiteWhere {
    pub fn site_id(site_id: impl Into<String>) -> Self {
        Self {
            site_id: Some(site_id.into()),
            sub_domain: None,
        }
    }

    pub fn sub_domain(sub_domain: impl Into<String>) -> Self {
        Self {
            site_id: None,
            sub_domain: Some(sub_domain.into()),
        }
    }
}

/// Params of the `site` endpoint, discriminated by `_action`.
///
/// ```json
/// { "_action": "update", "where": { "siteId": "…" }, "fields": { "title": "Acme" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "_action", rename_all = "camelCase")]
pub enum ManageSiteParams {
    Create {
        fields: SiteConfig,
    },
    Retrieve {
        #[serde(rename = "where")]
        selector: SiteWhere,
    },
    Update {
        #[serde(rename = "where")]
        selector: SiteWhere,
        fields: SiteConfig,
    },
    Delete {
        #[serde(rename = "where")]
        selector: SiteWhere,
    },
    /// Sites owned by `userId`, or by the caller when absent.
    List {
        #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
}
