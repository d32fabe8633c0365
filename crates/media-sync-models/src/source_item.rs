use crate::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One completed entry fetched from the source service, already normalized
/// so movies, shows and anime share a single shape.
///
/// `identifiers` keeps the raw JSON scalars exactly as the source returned
/// them (Simkl mixes strings and integers across schemes). Interpretation of
/// those values is left to whoever consumes the item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceItem {
    pub category: Category,
    #[serde(default)]
    pub identifiers: BTreeMap<String, Value>,
    pub title: Option<String>,
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
}

/// A single watched episode of a show or anime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub watched_at: Option<DateTime<Utc>>,
}

impl SourceItem {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            identifiers: BTreeMap::new(),
            title: None,
            year: None,
            last_watched_at: None,
            episodes: Vec::new(),
        }
    }

    pub fn with_id(mut self, scheme: &str, value: impl Into<Value>) -> Self {
        self.identifiers.insert(scheme.to_string(), value.into());
        self
    }

    pub fn with_title(mut self, title: &str, year: Option<u32>) -> Self {
        self.title = Some(title.to_string());
        self.year = year;
        self
    }

    /// Raw identifier value for a scheme, if the key exists at all
    pub fn id(&self, scheme: &str) -> Option<&Value> {
        self.identifiers.get(scheme)
    }

    /// Identifier rendered as plain text (strings verbatim, numbers in decimal)
    ///
    /// Null and structured values render as `None`.
    pub fn id_text(&self, scheme: &str) -> Option<String> {
        match self.identifiers.get(scheme)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Episodic item that arrived without any episode detail
    pub fn is_episodeless(&self) -> bool {
        self.category.is_episodic() && self.episodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_text_renders_numbers_and_strings() {
        let item = SourceItem::new(Category::Show)
            .with_id("tvdb", 81189)
            .with_id("imdb", "tt0903747")
            .with_id("slug", Value::Null);

        assert_eq!(item.id_text("tvdb").as_deref(), Some("81189"));
        assert_eq!(item.id_text("imdb").as_deref(), Some("tt0903747"));
        assert_eq!(item.id_text("slug"), None);
        assert!(item.id("slug").is_some());
        assert_eq!(item.id_text("tmdb"), None);
    }

    #[test]
    fn test_episodeless_only_applies_to_episodic_categories() {
        assert!(!SourceItem::new(Category::Movie).is_episodeless());
        assert!(SourceItem::new(Category::Anime).is_episodeless());

        let mut show = SourceItem::new(Category::Show);
        show.episodes.push(EpisodeRecord { season: Some(1), episode: Some(1), watched_at: None });
        assert!(!show.is_episodeless());
    }
}
