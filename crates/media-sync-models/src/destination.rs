use crate::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::ops::AddAssign;

/// Identifier schemes the destination history endpoint accepts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
    /// Carried verbatim from the source, `null` included; `None` means no slug key
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present_value")]
    pub slug: Option<Value>,
}

/// A key that is present deserializes to `Some`, even when its value is `null`
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl DestinationIds {
    pub fn is_empty(&self) -> bool {
        self.imdb.is_none() && self.tmdb.is_none() && self.slug.is_none()
    }
}

/// One entry of a `/sync/history` submission.
///
/// Only constructible with at least one identifier; an item without usable
/// identifiers has no representation here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationRecord {
    ids: DestinationIds,
    #[serde(skip_serializing_if = "Option::is_none")]
    watched_at: Option<DateTime<Utc>>,
}

impl DestinationRecord {
    /// Returns `None` when `ids` carries no identifier
    pub fn new(ids: DestinationIds, watched_at: Option<DateTime<Utc>>) -> Option<Self> {
        if ids.is_empty() {
            return None;
        }
        Some(Self { ids, watched_at })
    }

    pub fn ids(&self) -> &DestinationIds {
        &self.ids
    }

    pub fn watched_at(&self) -> Option<DateTime<Utc>> {
        self.watched_at
    }
}

/// Request body for the destination history endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryPayload {
    pub movies: Vec<DestinationRecord>,
    pub shows: Vec<DestinationRecord>,
}

impl HistoryPayload {
    /// Place a batch under `movies` for movie batches and under `shows` for
    /// everything else; the other key stays an empty list.
    pub fn for_batch(kind: Category, batch: &[DestinationRecord]) -> Self {
        if kind.is_movie() {
            Self { movies: batch.to_vec(), shows: Vec::new() }
        } else {
            Self { movies: Vec::new(), shows: batch.to_vec() }
        }
    }
}

/// Counts the destination reports as newly added for one submission
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddedCounts {
    #[serde(default)]
    pub movies: u64,
    #[serde(default)]
    pub shows: u64,
    #[serde(default)]
    pub episodes: u64,
}

impl AddAssign for AddedCounts {
    fn add_assign(&mut self, other: Self) {
        self.movies += other.movies;
        self.shows += other.shows;
        self.episodes += other.episodes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn imdb(id: &str) -> DestinationRecord {
        DestinationRecord::new(
            DestinationIds { imdb: Some(id.to_string()), ..Default::default() },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_record_requires_an_identifier() {
        assert!(DestinationRecord::new(DestinationIds::default(), None).is_none());
    }

    #[test]
    fn test_record_serializes_only_present_fields() {
        let record = DestinationRecord::new(
            DestinationIds { tmdb: Some(42), ..Default::default() },
            None,
        )
        .unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"ids": {"tmdb": 42}}));
    }

    #[test]
    fn test_null_slug_is_kept_as_an_identifier() {
        let record = DestinationRecord::new(
            DestinationIds { slug: Some(Value::Null), ..Default::default() },
            None,
        )
        .unwrap();
        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(body, json!({"ids": {"slug": null}}));

        let parsed: DestinationRecord = serde_json::from_value(body).unwrap();
        assert_eq!(parsed, record);
        let parsed: DestinationIds = serde_json::from_value(json!({"imdb": "tt1"})).unwrap();
        assert_eq!(parsed.slug, None);
    }

    #[test]
    fn test_anime_batch_goes_under_shows() {
        let payload = HistoryPayload::for_batch(Category::Anime, &[imdb("tt1"), imdb("tt2")]);
        assert!(payload.movies.is_empty());
        assert_eq!(payload.shows.len(), 2);

        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["movies"], json!([]));
        assert_eq!(body["shows"][0]["ids"]["imdb"], "tt1");
    }

    #[test]
    fn test_movie_batch_goes_under_movies() {
        let payload = HistoryPayload::for_batch(Category::Movie, &[imdb("tt1")]);
        assert_eq!(payload.movies.len(), 1);
        assert!(payload.shows.is_empty());
    }

    #[test]
    fn test_added_counts_default_missing_fields() {
        let counts: AddedCounts = serde_json::from_value(json!({"movies": 3})).unwrap();
        assert_eq!(counts, AddedCounts { movies: 3, shows: 0, episodes: 0 });

        let mut total = AddedCounts::default();
        total += counts;
        total += AddedCounts { movies: 0, shows: 1, episodes: 12 };
        assert_eq!(total, AddedCounts { movies: 3, shows: 1, episodes: 12 });
    }
}
