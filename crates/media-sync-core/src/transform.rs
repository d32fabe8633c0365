use media_sync_models::{DestinationIds, DestinationRecord, EpisodelessPolicy, SourceItem};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Record-fatal transformation failure. The offending item is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum TransformError {
    #[error("'{title}': tmdb id {value} is not an integer")]
    InvalidTmdb { title: String, value: String },
}

/// Output side of the transformer.
///
/// A sink turns one normalized `SourceItem` into zero or more output records.
/// Returning an empty list discards the item; returning an error fails only
/// that item.
pub trait RecordSink {
    type Record;

    /// How shows and anime without per-episode data are treated
    fn episodeless_policy(&self) -> EpisodelessPolicy;

    fn shape(&self, item: &SourceItem) -> Result<Vec<Self::Record>, TransformError>;
}

/// Result of running a batch of items through a sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformOutcome<R> {
    pub records: Vec<R>,
    /// Items that produced no record (e.g. no usable identifier)
    pub discarded_without_ids: usize,
    pub skipped_episodeless: usize,
    pub failures: Vec<TransformError>,
}

impl<R> Default for TransformOutcome<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            discarded_without_ids: 0,
            skipped_episodeless: 0,
            failures: Vec::new(),
        }
    }
}

pub struct Transformer<S> {
    sink: S,
}

impl<S: RecordSink> Transformer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Shape every item in order. Pure: the same input always yields the same outcome.
    pub fn run(&self, items: &[SourceItem]) -> TransformOutcome<S::Record> {
        let mut outcome = TransformOutcome::default();
        let skip_episodeless = self.sink.episodeless_policy() == EpisodelessPolicy::Skip;

        for item in items {
            if skip_episodeless && item.is_episodeless() {
                outcome.skipped_episodeless += 1;
                continue;
            }

            match self.sink.shape(item) {
                Ok(records) if records.is_empty() => {
                    outcome.discarded_without_ids += 1;
                    debug!(
                        category = %item.category,
                        title = item.title.as_deref().unwrap_or("<untitled>"),
                        "Discarding item without usable identifiers"
                    );
                }
                Ok(records) => outcome.records.extend(records),
                Err(e) => {
                    warn!("Skipping {} item: {}", item.category, e);
                    outcome.failures.push(e);
                }
            }
        }

        outcome
    }
}

/// Shapes items into destination history records, one per item
#[derive(Debug, Clone)]
pub struct DestinationSink {
    episodeless: EpisodelessPolicy,
}

impl DestinationSink {
    pub fn new(episodeless: EpisodelessPolicy) -> Self {
        Self { episodeless }
    }
}

impl Default for DestinationSink {
    /// Episode-less shows are uploaded as identifier-only records
    fn default() -> Self {
        Self::new(EpisodelessPolicy::Include)
    }
}

impl RecordSink for DestinationSink {
    type Record = DestinationRecord;

    fn episodeless_policy(&self) -> EpisodelessPolicy {
        self.episodeless
    }

    fn shape(&self, item: &SourceItem) -> Result<Vec<DestinationRecord>, TransformError> {
        let ids = destination_ids(item)?;
        Ok(DestinationRecord::new(ids, item.last_watched_at).into_iter().collect())
    }
}

/// Truthiness of a raw identifier value: empty strings, zero and null don't count
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn coerce_tmdb(item: &SourceItem, value: &Value) -> Result<u64, TransformError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| TransformError::InvalidTmdb {
        title: item.title.clone().unwrap_or_default(),
        value: value.to_string(),
    })
}

/// Map source identifiers onto the schemes the destination accepts.
///
/// `imdb` and `tmdb` are taken only when truthy, `tmdb` as an integer.
/// `slug` is copied as-is whenever the key exists, even when empty or null.
pub fn destination_ids(item: &SourceItem) -> Result<DestinationIds, TransformError> {
    let mut ids = DestinationIds::default();

    if let Some(imdb) = item.id("imdb").filter(|v| is_truthy(v)) {
        ids.imdb = item.id_text("imdb").or_else(|| Some(imdb.to_string()));
    }
    if let Some(tmdb) = item.id("tmdb").filter(|v| is_truthy(v)) {
        ids.tmdb = Some(coerce_tmdb(item, tmdb)?);
    }
    if let Some(slug) = item.id("slug") {
        ids.slug = Some(slug.clone());
    }

    Ok(ids)
}

/// Transform items into destination records, skipping items that fail
pub fn transform(items: &[SourceItem]) -> Vec<DestinationRecord> {
    Transformer::new(DestinationSink::default()).run(items).records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use media_sync_models::{Category, EpisodeRecord};
    use serde_json::json;

    fn movie() -> SourceItem {
        SourceItem::new(Category::Movie)
    }

    #[test]
    fn test_drops_items_without_ids_and_coerces_tmdb() {
        let items = vec![
            movie().with_id("imdb", "tt1"),
            movie(),
            movie().with_id("tmdb", "42"),
        ];

        let records = transform(&items);
        let bodies: Vec<_> = records.iter().map(|r| serde_json::to_value(r).unwrap()).collect();
        assert_eq!(bodies, vec![json!({"ids": {"imdb": "tt1"}}), json!({"ids": {"tmdb": 42}})]);
    }

    #[test]
    fn test_falsy_imdb_and_tmdb_are_ignored() {
        let items = vec![
            movie().with_id("imdb", "").with_id("tmdb", ""),
            movie().with_id("imdb", Value::Null).with_id("tmdb", 0),
            movie().with_id("tvdb", "12345").with_id("simkl", 99),
        ];

        let outcome = Transformer::new(DestinationSink::default()).run(&items);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.discarded_without_ids, 3);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_slug_is_copied_even_when_empty() {
        let item = movie().with_id("slug", "").with_id("imdb", "");
        let records = transform(&[item]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ids().slug, Some(json!("")));
        assert_eq!(records[0].ids().imdb, None);
    }

    #[test]
    fn test_null_slug_is_copied() {
        let records = transform(&[movie().with_id("slug", Value::Null)]);
        assert_eq!(records.len(), 1);
        assert_eq!(serde_json::to_value(&records[0]).unwrap(), json!({"ids": {"slug": null}}));
    }

    #[test]
    fn test_numeric_tmdb_is_accepted() {
        let ids = destination_ids(&movie().with_id("tmdb", 603)).unwrap();
        assert_eq!(ids.tmdb, Some(603));
        let ids = destination_ids(&movie().with_id("tmdb", " 604 ")).unwrap();
        assert_eq!(ids.tmdb, Some(604));
    }

    #[test]
    fn test_integral_float_tmdb_is_accepted() {
        let ids = destination_ids(&movie().with_id("tmdb", 603.0)).unwrap();
        assert_eq!(ids.tmdb, Some(603));

        let err = destination_ids(&movie().with_id("tmdb", 603.5)).unwrap_err();
        assert!(matches!(err, TransformError::InvalidTmdb { .. }));
    }

    #[test]
    fn test_invalid_tmdb_fails_only_that_item() {
        let items = vec![
            movie().with_id("imdb", "tt1"),
            movie().with_title("Broken", None).with_id("imdb", "tt2").with_id("tmdb", "abc"),
            movie().with_id("tmdb", -5),
            movie().with_id("imdb", "tt3"),
        ];

        let outcome = Transformer::new(DestinationSink::default()).run(&items);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(
            outcome.failures[0],
            TransformError::InvalidTmdb { title: "Broken".to_string(), value: "\"abc\"".to_string() }
        );
        assert_eq!(outcome.records[1].ids().imdb.as_deref(), Some("tt3"));
    }

    #[test]
    fn test_record_count_equals_inputs_minus_filtered_minus_failed() {
        let items: Vec<SourceItem> = (0..30)
            .map(|i| match i % 3 {
                0 => movie().with_id("imdb", format!("tt{}", i)),
                1 => movie().with_id("tvdb", i),
                _ if i % 2 == 0 => movie().with_id("tmdb", "x"),
                _ => movie().with_id("tmdb", i.to_string()),
            })
            .collect();

        let outcome = Transformer::new(DestinationSink::default()).run(&items);
        assert_eq!(
            outcome.records.len(),
            items.len() - outcome.discarded_without_ids - outcome.failures.len()
        );
        assert_eq!(outcome.discarded_without_ids, 10);
        assert_eq!(outcome.failures.len(), 5);
    }

    #[test]
    fn test_watched_at_is_carried_over() {
        let watched = Utc.with_ymd_and_hms(2023, 4, 1, 20, 15, 0).unwrap();
        let mut item = SourceItem::new(Category::Show).with_id("imdb", "tt0903747");
        item.last_watched_at = Some(watched);
        item.episodes.push(EpisodeRecord { season: Some(1), episode: Some(1), watched_at: None });

        let records = transform(&[item]);
        assert_eq!(records[0].watched_at(), Some(watched));
        assert_eq!(
            serde_json::to_value(&records[0]).unwrap(),
            json!({"ids": {"imdb": "tt0903747"}, "watched_at": "2023-04-01T20:15:00Z"})
        );
    }

    #[test]
    fn test_episodeless_policy() {
        let items = vec![
            SourceItem::new(Category::Anime).with_id("imdb", "tt1"),
            SourceItem::new(Category::Movie).with_id("imdb", "tt2"),
        ];

        let include = Transformer::new(DestinationSink::default()).run(&items);
        assert_eq!(include.records.len(), 2);

        let skip = Transformer::new(DestinationSink::new(EpisodelessPolicy::Skip)).run(&items);
        assert_eq!(skip.records.len(), 1);
        assert_eq!(skip.skipped_episodeless, 1);
        assert_eq!(skip.records[0].ids().imdb.as_deref(), Some("tt2"));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let items = vec![
            movie().with_id("imdb", "tt1").with_id("tmdb", "7").with_id("slug", "a"),
            movie().with_id("tmdb", "bad"),
            SourceItem::new(Category::Show).with_id("slug", "b"),
        ];
        let transformer = Transformer::new(DestinationSink::default());
        assert_eq!(transformer.run(&items), transformer.run(&items));
    }
}
