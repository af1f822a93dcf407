//! Themes and page templates.
//!
//! A [`Theme`] supplies the defaults a new site starts from: a registry of
//! page [`Template`]s, site-level default sections, and default pages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::card::CardConfig;

/// A page template. Pages bound to it (via `templateId`) contribute the
/// template's `sections` to the site's section set with `template` scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub template_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Sections declared by this template, keyed by section id.
    #[serde(default)]
    pub sections: BTreeMap<String, CardConfig>,
}

impl Template {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            ..Default::default()
        }
    }

    pub fn with_section(mut self, section_id: impl Into<String>, config: CardConfig) -> Self {
        self.sections.insert(section_id.into(), config);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub theme_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub templates: Vec<Template>,

    /// Default sections applied when a site is created from this theme.
    #[serde(default)]
    pub sections: BTreeMap<String, CardConfig>,

    /// Pages a new site gets when it does not bring its own.
    #[serde(default)]
    pub pages: Vec<CardConfig>,
}

impl Theme {
    pub fn new(theme_id: impl Into<String>) -> Self {
        Self {
            theme_id: theme_id.into(),
            ..Default::default()
        }
    }

    /// Look up a page template by id.
    pub fn template(&self, template_id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.template_id == template_id)
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.push(template);
        self
    }

    pub fn with_section(mut self, section_id: impl Into<String>, config: CardConfig) -> Self {
        self.sections.insert(section_id.into(), config);
        self
    }

    pub fn with_page(mut self, page: CardConfig) -> Self {
        self.pages.push(page);
        self
    }
}
