//! Site configuration tree for Siteframe.
//!
//! A site is a tree of [`Card`]s: an ordered list of pages plus a map of
//! named sections (headers, footers, and other regions shared across pages).
//! This crate holds that tree in memory and reconciles it with configuration
//! coming from three places: the server, local static storage, and the
//! theme/templates the site is built from.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`card`] | [`Card`] nodes and their portable [`CardConfig`] form |
//! | [`theme`] | [`Theme`] and page [`Template`] registries |
//! | [`config`] | [`SiteConfig`], the portable table/wire form of a site |
//! | [`site`] | The live [`Site`] aggregate and its URLs |
//! | [`reconcile`] | [`set_sections`] and [`update_site`] |
//! | [`save`] | [`SiteHandle`] and [`save_site`] |
//! | [`local`] | Local key-value storage for static sites |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use siteframe::{Site, SiteConfig, SiteHandle, SiteSettings};
//!
//! let site = Site::new(SiteConfig::with_site_id("s1"), SiteSettings::default())?;
//! let handle = SiteHandle::new(site);
//! handle.update(SiteConfig { title: Some("Acme".into()), ..Default::default() });
//! ```

pub mod card;
pub mod config;
pub mod local;
pub mod reconcile;
pub mod save;
pub mod site;
pub mod theme;

pub use card::{set_pages, Card, CardConfig, CardScope};
pub use config::{CustomDomain, SiteConfig, SiteKey, SiteStatus};
pub use local::{local_site_config, LocalStore, LocalStoreError, MemoryLocalStore};
pub use reconcile::{resolve_sections, set_sections, template_sections, update_site, SectionMap};
pub use save::{save_site, RemoteError, SaveError, SaveOptions, SiteHandle, SiteRemote};
pub use site::{Site, SiteError, SiteSettings, SiteUrls, UrlMode};
pub use theme::{Template, Theme};
