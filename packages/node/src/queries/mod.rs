//! Built-in queries.
//!
//! | Key | Query | Actions |
//! |-----|-------|---------|
//! | `user` | [`ManageUser`] | `getPrivate`, `getPublic`, `current` |
//! | `site` | [`ManageSite`] | `create`, `retrieve`, `update`, `delete`, `list` |

pub mod site;
pub mod user;

pub use site::{InProcessSiteRemote, ManageSite, SiteView};
pub use user::{ManageUser, UserView};

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
