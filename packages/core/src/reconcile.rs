//! Reconciliation of the site's section map and field-level updates.
//!
//! Sections come from four sources. For a given section id the first source
//! that has it wins, in this order:
//!
//! 1. sections supplied by the caller,
//! 2. sections already present on the site,
//! 3. default sections from the theme,
//! 4. sections declared by the templates of the site's pages.
//!
//! A section is `template`-scoped iff its id appears in source 4. The result
//! always replaces the site's section map wholesale.

use std::collections::{BTreeMap, BTreeSet};

use crate::card::{set_pages, Card, CardConfig, CardScope};
use crate::config::SiteConfig;
use crate::site::Site;

pub type SectionMap = BTreeMap<String, CardConfig>;

/// Resolve the section map from its four sources.
pub fn resolve_sections(
    existing: &SectionMap,
    supplied: &SectionMap,
    theme: &SectionMap,
    template: &SectionMap,
) -> BTreeMap<String, Card> {
    let ids: BTreeSet<&String> = existing
        .keys()
        .chain(supplied.keys())
        .chain(theme.keys())
        .chain(template.keys())
        .collect();

    ids.into_iter()
        .map(|id| {
            let scope = if template.contains_key(id) {
                CardScope::Template
            } else {
                CardScope::Site
            };

            let mut config = supplied
                .get(id)
                .or_else(|| existing.get(id))
                .or_else(|| theme.get(id))
                .or_else(|| template.get(id))
                .cloned()
                .unwrap_or_default();
            config.card_id.get_or_insert_with(|| id.clone());

            (id.clone(), Card::new(config, id.clone(), scope))
        })
        .collect()
}

/// Sections declared by the templates of the site's pages.
///
/// Later pages overwrite earlier ones on id collision.
pub fn template_sections(site: &Site) -> SectionMap {
    let theme = &site.settings.theme;
    site.pages
        .iter()
        .filter_map(|page| page.template_id.as_deref())
        .filter_map(|template_id| theme.template(template_id))
        .fold(SectionMap::new(), |mut acc, template| {
            acc.extend(template.sections.clone());
            acc
        })
}

/// Rebuild `site.sections` from existing, supplied, theme, and template
/// sections.
pub fn set_sections(site: &mut Site, supplied: Option<&SectionMap>, theme: Option<&SectionMap>) {
    let empty = SectionMap::new();

    let existing: SectionMap = site
        .sections
        .iter()
        .map(|(id, card)| (id.clone(), card.to_config()))
        .collect();
    let template = template_sections(site);

    site.sections = resolve_sections(
        &existing,
        supplied.unwrap_or(&empty),
        theme.unwrap_or(&empty),
        &template,
    );
}

/// Apply `new_config` to the live site.
///
/// Only `title`, `userConfig`, `changeId`, `subDomain`, `customDomains`,
/// `themeId` and `status` are taken over, and only when set. `editor` is
/// shallow-merged. New `pages` rebuild the page list and re-run section
/// reconciliation; new `sections` are reconciled as supplied overrides.
/// Everything else in `new_config` is ignored.
pub fn update_site(site: &mut Site, new_config: SiteConfig) {
    let SiteConfig {
        title,
        user_config,
        change_id,
        sub_domain,
        custom_domains,
        theme_id,
        status,
        editor,
        pages,
        sections,
        ..
    } = new_config;

    if let Some(title) = title {
        site.title = Some(title);
    }
    if let Some(user_config) = user_config {
        site.user_config = user_config;
    }
    if let Some(change_id) = change_id {
        site.change_id = Some(change_id);
    }
    if let Some(sub_domain) = sub_domain {
        site.sub_domain = Some(sub_domain);
    }
    if let Some(custom_domains) = custom_domains {
        site.custom_domains = custom_domains;
    }
    if let Some(theme_id) = theme_id {
        site.theme_id = Some(theme_id);
    }
    if let Some(status) = status {
        site.status = status;
    }

    if let Some(editor) = editor {
        site.editor.extend(editor);
    }

    if let Some(pages) = pages {
        site.pages = set_pages(pages);
        set_sections(site, None, None);
    }

    if let Some(sections) = sections {
        set_sections(site, Some(&sections), None);
    }

    site.bump_revision();
}
