use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt::Display};

/// Identifier for a catalog item
///
/// Catalog sources hand out either numeric keys (database rows) or opaque
/// strings. Ordering puts every integer before every string so that mixed
/// catalogs still rank deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Int(id) => write!(f, "{}", id),
            ItemId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ItemId::Int(a), ItemId::Int(b)) => a.cmp(b),
            (ItemId::Text(a), ItemId::Text(b)) => a.cmp(b),
            (ItemId::Int(_), ItemId::Text(_)) => Ordering::Less,
            (ItemId::Text(_), ItemId::Int(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId::Int(id)
    }
}

impl From<i32> for ItemId {
    fn from(id: i32) -> Self {
        ItemId::Int(id as i64)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::Text(id.to_string())
    }
}

/// A movie as delivered by the catalog source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub genre: String,
    /// URL or local path of the cover image
    pub image_reference: String,
}

impl CatalogItem {
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        genre: impl Into<String>,
        image_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genre: genre.into(),
            image_reference: image_reference.into(),
        }
    }
}

/// The image a user wants recommendations for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    pub title: Option<String>,
    pub image_reference: String,
}

impl RecommendationQuery {
    pub fn new(image_reference: impl Into<String>) -> Self {
        Self {
            title: None,
            image_reference: image_reference.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
