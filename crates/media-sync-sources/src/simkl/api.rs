use crate::http::{ensure_success, read_json};
use crate::SourceError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use media_sync_models::{Category, EpisodeRecord, SourceItem};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Integers or numeric strings; anything else (negative, fractional, text) reads as absent
fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
struct SimklDescriptor {
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    year: Option<u32>,
    ids: Option<BTreeMap<String, Value>>,
}

/// Flat per-episode entry (`season` + `episode`)
#[derive(Debug, Deserialize)]
struct SimklFlatEpisode {
    #[serde(default, deserialize_with = "lenient_u32")]
    season: Option<u32>,
    #[serde(default, alias = "number", deserialize_with = "lenient_u32")]
    episode: Option<u32>,
    watched_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimklSeasonEpisode {
    #[serde(default, deserialize_with = "lenient_u32")]
    number: Option<u32>,
    watched_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimklSeason {
    #[serde(default, deserialize_with = "lenient_u32")]
    number: Option<u32>,
    episodes: Option<Vec<SimklSeasonEpisode>>,
}

/// One entry of a completed-items collection.
///
/// Movies carry a `movie` descriptor. Shows and anime wrap a `show` (or
/// `anime`) descriptor and optionally list watched episodes, either flat or
/// grouped by season.
#[derive(Debug, Deserialize)]
struct SimklEntry {
    last_watched_at: Option<String>,
    movie: Option<SimklDescriptor>,
    show: Option<SimklDescriptor>,
    anime: Option<SimklDescriptor>,
    episodes: Option<Vec<SimklFlatEpisode>>,
    seasons: Option<Vec<SimklSeason>>,
}

/// Entries stay raw here so one malformed entry can be skipped on its own
#[derive(Debug, Default, Deserialize)]
struct SimklAllItemsResponse {
    movies: Option<Vec<Value>>,
    shows: Option<Vec<Value>>,
    anime: Option<Vec<Value>>,
}

/// Fetch the completed collection of one category with full identifier expansion
pub async fn fetch_completed_items(
    client: &Client,
    api_url: &str,
    access_token: &str,
    client_id: &str,
    category: Category,
) -> Result<Vec<SourceItem>, SourceError> {
    let url = format!(
        "{}/sync/all-items/{}/completed?extended=full",
        api_url.trim_end_matches('/'),
        category.collection_key()
    );

    let response = client
        .get(&url)
        .header("Authorization", format!("Bearer {}", access_token))
        .header("simkl-api-key", client_id)
        .header("Accept", "application/json")
        .send()
        .await?;

    let response = ensure_success(response).await?;
    let body: Value = read_json(response).await?;
    normalize_response(category, body)
}

/// Flatten the per-category response into uniform `SourceItem`s.
///
/// Simkl answers `null` (or an empty object) when the collection is empty.
pub fn normalize_response(category: Category, body: Value) -> Result<Vec<SourceItem>, SourceError> {
    if body.is_null() {
        return Ok(Vec::new());
    }

    let response: SimklAllItemsResponse = serde_json::from_value(body)?;
    let entries = match category {
        Category::Movie => response.movies,
        Category::Show => response.shows,
        Category::Anime => response.anime,
    }
    .unwrap_or_default();

    let total = entries.len();
    let mut malformed = 0;
    let mut items = Vec::with_capacity(total);
    for (index, raw) in entries.into_iter().enumerate() {
        match serde_json::from_value::<SimklEntry>(raw) {
            Ok(entry) => items.extend(normalize_entry(category, entry)),
            Err(e) => {
                malformed += 1;
                warn!(category = %category, index, "Skipping malformed Simkl entry: {}", e);
            }
        }
    }

    if items.len() + malformed < total {
        debug!(
            category = %category,
            skipped = total - items.len() - malformed,
            "Simkl entries without a descriptor object were skipped"
        );
    }

    Ok(items)
}

fn normalize_entry(category: Category, entry: SimklEntry) -> Option<SourceItem> {
    let descriptor = match category {
        Category::Movie => entry.movie,
        Category::Show => entry.show.or(entry.anime),
        Category::Anime => entry.anime.or(entry.show),
    }?;

    let episodes = if category.is_episodic() {
        collect_episodes(entry.episodes, entry.seasons)
    } else {
        Vec::new()
    };

    Some(SourceItem {
        category,
        identifiers: descriptor.ids.unwrap_or_default(),
        title: descriptor.title,
        year: descriptor.year,
        last_watched_at: entry.last_watched_at.as_deref().and_then(parse_timestamp),
        episodes,
    })
}

/// Prefer the flat episode list; fall back to the season-grouped one
fn collect_episodes(
    flat: Option<Vec<SimklFlatEpisode>>,
    seasons: Option<Vec<SimklSeason>>,
) -> Vec<EpisodeRecord> {
    if let Some(flat) = flat.filter(|episodes| !episodes.is_empty()) {
        return flat
            .into_iter()
            .map(|ep| EpisodeRecord {
                season: ep.season,
                episode: ep.episode,
                watched_at: ep.watched_at.as_deref().and_then(parse_timestamp),
            })
            .collect();
    }

    seasons
        .unwrap_or_default()
        .into_iter()
        .flat_map(|season| {
            let number = season.number;
            season.episodes.unwrap_or_default().into_iter().map(move |ep| EpisodeRecord {
                season: number,
                episode: ep.number,
                watched_at: ep.watched_at.as_deref().and_then(parse_timestamp),
            })
        })
        .collect()
}

/// Simkl timestamps are RFC 3339, with an occasional bare `YYYY-MM-DD HH:MM:SS`
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    warn!("Ignoring unparseable Simkl timestamp: {}", raw);
    None
}
