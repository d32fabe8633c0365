use crate::http::{ensure_success, read_json};
use crate::SourceError;
use media_sync_models::{AddedCounts, HistoryPayload};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Response of `POST /sync/history`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub added: AddedCounts,
    #[serde(default)]
    pub not_found: Option<Value>,
}

impl HistoryResponse {
    /// Number of submitted entries Trakt could not match
    pub fn not_found_count(&self) -> usize {
        let Some(Value::Object(groups)) = &self.not_found else {
            return 0;
        };
        groups
            .values()
            .filter_map(|v| v.as_array())
            .map(|entries| entries.len())
            .sum()
    }
}

/// Add watched entries to the user's Trakt history
pub async fn add_to_history(
    client: &Client,
    api_url: &str,
    access_token: &str,
    client_id: &str,
    payload: &HistoryPayload,
) -> Result<HistoryResponse, SourceError> {
    let response = client
        .post(format!("{}/sync/history", api_url.trim_end_matches('/')))
        .header("Authorization", format!("Bearer {}", access_token))
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .json(payload)
        .send()
        .await?;

    let response = ensure_success(response).await?;
    let history: HistoryResponse = read_json(response).await?;

    let not_found = history.not_found_count();
    if not_found > 0 {
        warn!(not_found, "Trakt could not match some submitted entries");
    }
    debug!(
        movies = history.added.movies,
        shows = history.added.shows,
        episodes = history.added.episodes,
        "Trakt history response"
    );

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_response_counts() {
        let response: HistoryResponse = serde_json::from_value(json!({
            "added": {"movies": 2, "episodes": 40},
            "not_found": {
                "movies": [{"ids": {"imdb": "tt0000000"}}],
                "shows": [],
                "episodes": [{"ids": {"tmdb": 1}}, {"ids": {"tmdb": 2}}]
            }
        }))
        .unwrap();

        assert_eq!(response.added, AddedCounts { movies: 2, shows: 0, episodes: 40 });
        assert_eq!(response.not_found_count(), 3);
    }

    #[test]
    fn test_history_response_without_added() {
        let response: HistoryResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.added, AddedCounts::default());
        assert_eq!(response.not_found_count(), 0);
    }
}
