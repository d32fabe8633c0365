use crate::SourceError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

// Trakt sits behind Cloudflare, which rejects requests without a browser-like user agent
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Create the shared reqwest Client with an explicit per-request timeout
pub fn create_client(timeout: Duration) -> Result<Client, SourceError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(SourceError::from)
}

/// Turn a non-2xx response into `SourceError::Http`, keeping the body for diagnostics
pub async fn ensure_success(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Http { status: status.as_u16(), body })
}

/// Read the body as text and decode it, so malformed JSON surfaces as `SourceError::Decode`
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SourceError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}
