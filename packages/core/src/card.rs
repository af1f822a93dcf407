//! Cards: the nodes of the site configuration tree.
//!
//! A [`CardConfig`] is the portable form of a card, as stored in the site
//! table and sent over the wire. A [`Card`] is the live node held by a
//! [`Site`](crate::Site): it always has an id, a region, and a scope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a section's default configuration originates.
///
/// Serialises as a lowercase string (`"template"` or `"site"`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardScope {
    /// Declared by the template of one of the site's pages.
    Template,
    /// Declared by the site itself (user override or theme default).
    #[default]
    Site,
}

impl std::fmt::Display for CardScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardScope::Template => write!(f, "template"),
            CardScope::Site => write!(f, "site"),
        }
    }
}

/// Portable card configuration.
///
/// Every field is optional so that partial configurations (theme defaults,
/// template declarations, user overrides) share one type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    /// Identifier of the card template that renders this card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<CardScope>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// Free-form settings edited by the site owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Map<String, Value>>,

    /// Child cards, in display order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<CardConfig>>,
}

impl CardConfig {
    /// A config carrying only a card template id.
    pub fn with_template(template_id: impl Into<String>) -> Self {
        Self {
            template_id: Some(template_id.into()),
            ..Default::default()
        }
    }
}

/// A live node of the site configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub card_id: String,
    pub template_id: Option<String>,
    pub region_id: String,
    pub scope: CardScope,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub layout: Option<String>,
    pub user_config: Map<String, Value>,
    pub cards: Vec<Card>,
}

impl Card {
    /// Build a card from its portable config, placing it in `region_id` with
    /// the given `scope`.
    ///
    /// The placement always wins over any `regionId`/`scope` carried by the
    /// config. Cards without an id get a fresh UUIDv7. Children inherit the
    /// parent's scope and, unless they name one, its region.
    pub fn new(config: CardConfig, region_id: impl Into<String>, scope: CardScope) -> Self {
        let region_id = region_id.into();
        let cards = config
            .cards
            .unwrap_or_default()
            .into_iter()
            .map(|child| {
                let child_region = child.region_id.clone().unwrap_or_else(|| region_id.clone());
                Card::new(child, child_region, scope)
            })
            .collect();

        Self {
            card_id: config.card_id.unwrap_or_else(new_card_id),
            template_id: config.template_id,
            region_id,
            scope,
            title: config.title,
            slug: config.slug,
            layout: config.layout,
            user_config: config.user_config.unwrap_or_default(),
            cards,
        }
    }

    /// Convert back to the portable form.
    ///
    /// `Card::new(card.to_config(), card.region_id, card.scope)` yields a card
    /// equal to `card`.
    pub fn to_config(&self) -> CardConfig {
        CardConfig {
            card_id: Some(self.card_id.clone()),
            template_id: self.template_id.clone(),
            region_id: Some(self.region_id.clone()),
            scope: Some(self.scope),
            title: self.title.clone(),
            slug: self.slug.clone(),
            layout: self.layout.clone(),
            user_config: Some(self.user_config.clone()),
            cards: if self.cards.is_empty() {
                None
            } else {
                Some(self.cards.iter().map(Card::to_config).collect())
            },
        }
    }
}

/// Build the live page list from portable page configs.
///
/// Pages live in the `main` region and are always site-scoped.
pub fn set_pages(pages: Vec<CardConfig>) -> Vec<Card> {
    pages
        .into_iter()
        .map(|page| Card::new(page, "main", CardScope::Site))
        .collect()
}

fn new_card_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
