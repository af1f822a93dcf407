//! Wire types shared by Siteframe endpoints and their clients.
//!
//! Every endpoint answers HTTP 200 with an [`Envelope`]; the envelope's
//! `status` and `code` carry the application-level outcome.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET/POST | `{basePath}/user` | [`ManageUserParams`] → [`Envelope<User>`] |
//! | GET/POST | `{basePath}/site` | [`ManageSiteParams`] → `Envelope` of one [`SiteConfig`](siteframe::SiteConfig), or a list for `list` |
//! | GET | `/health` | → [`Envelope`] |

pub mod envelope;
pub mod error;
pub mod site;
pub mod user;

pub use envelope::{
    DataFilter, Envelope, FilterOperator, FilterValue, IndexMeta, ResponseStatus, SortOrder,
};
pub use error::codes;
pub use site::{ManageSiteParams, SiteWhere};
pub use user::{ManageUserParams, PublicUser, User, UserRole};
