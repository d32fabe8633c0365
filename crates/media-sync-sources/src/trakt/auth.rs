use crate::http::{ensure_success, read_json};
use crate::{AuthorizationPrompt, SourceError};
use chrono::{DateTime, Duration, Utc};
use media_sync_config::{CredentialStore, TraktConfig};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const AUTHORIZE_URL: &str = "https://trakt.tv/oauth/authorize";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<TokenResponse> for TokenInfo {
    fn from(token: TokenResponse) -> Self {
        // Two minutes of slack so a token is never used right at its expiry
        let expires_at = Utc::now() + Duration::seconds(token.expires_in as i64 - 120);
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        }
    }
}

pub fn authorize_url(client_id: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(REDIRECT_URI)
    )
}

async fn request_token(client: &Client, config: &TraktConfig, payload: serde_json::Value) -> Result<TokenInfo, SourceError> {
    let response = client
        .post(format!("{}/oauth/token", config.api_url.trim_end_matches('/')))
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    let response = ensure_success(response).await?;
    let token: TokenResponse = read_json(response).await?;
    Ok(token.into())
}

pub async fn exchange_code(client: &Client, config: &TraktConfig, code: &str) -> Result<TokenInfo, SourceError> {
    let payload = serde_json::json!({
        "code": code,
        "client_id": config.client_id,
        "client_secret": config.client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "authorization_code"
    });
    request_token(client, config, payload).await
}

pub async fn refresh_access_token(
    client: &Client,
    config: &TraktConfig,
    refresh_token: &str,
) -> Result<TokenInfo, SourceError> {
    let payload = serde_json::json!({
        "refresh_token": refresh_token,
        "client_id": config.client_id,
        "client_secret": config.client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "refresh_token"
    });
    request_token(client, config, payload).await
}

/// A cached token is reusable when it expires more than five minutes from now
fn cached_token(store: &CredentialStore) -> Option<String> {
    let token = store.get_trakt_access_token().filter(|t| !t.is_empty())?;
    match store.get_trakt_token_expires() {
        Some(expires_at) if expires_at > Utc::now() + Duration::minutes(5) => {
            info!("Using saved Trakt access token (expires at {})", expires_at);
            Some(token.clone())
        }
        Some(expires_at) => {
            info!("Trakt access token expired or expiring soon (expires at {}), refreshing", expires_at);
            None
        }
        None => None,
    }
}

/// Return a usable Trakt access token.
///
/// Order: cached unexpired token, refresh-token grant, then a new
/// authorization through `prompt`. New tokens are saved to the store.
pub async fn authenticate(
    client: &Client,
    config: &TraktConfig,
    store: &mut CredentialStore,
    prompt: &dyn AuthorizationPrompt,
) -> Result<String, SourceError> {
    if let Some(token) = cached_token(store) {
        return Ok(token);
    }

    let refreshed = match store.get_trakt_refresh_token().filter(|t| !t.is_empty()).cloned() {
        Some(refresh_token) => match refresh_access_token(client, config, &refresh_token).await {
            Ok(token_info) => Some(token_info),
            Err(e) => {
                warn!("Trakt token refresh failed, starting a new authorization: {}", e);
                None
            }
        },
        None => None,
    };

    let token_info = match refreshed {
        Some(token_info) => token_info,
        None => {
            let code = prompt
                .authorization_code("Trakt", &authorize_url(&config.client_id))
                .map_err(|e| SourceError::Authorization(e.to_string()))?;
            let code = code.trim();
            if code.is_empty() {
                return Err(SourceError::Authorization("authorization code cannot be empty".to_string()));
            }
            exchange_code(client, config, code).await?
        }
    };

    store.set_trakt_access_token(token_info.access_token.clone());
    store.set_trakt_refresh_token(token_info.refresh_token);
    store.set_trakt_token_expires(token_info.expires_at);
    store.save().map_err(|e| SourceError::CredentialStore(e.to_string()))?;

    info!("Authenticated to Trakt");
    Ok(token_info.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_authorize_url() {
        assert_eq!(
            authorize_url("cid"),
            "https://trakt.tv/oauth/authorize?response_type=code&client_id=cid&redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"
        );
    }

    #[test]
    fn test_cached_token_honours_expiry() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused"));
        assert_eq!(cached_token(&store), None);

        store.set_trakt_access_token("tok".to_string());
        // No expiry recorded: not trusted
        assert_eq!(cached_token(&store), None);

        store.set_trakt_token_expires(Utc::now() + Duration::minutes(2));
        assert_eq!(cached_token(&store), None);

        store.set_trakt_token_expires(Utc::now() + Duration::days(30));
        assert_eq!(cached_token(&store).as_deref(), Some("tok"));
    }

    #[test]
    fn test_token_info_expiry_has_slack() {
        let info: TokenInfo = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 7_776_000,
        }
        .into();
        let remaining = info.expires_at - Utc::now();
        assert!(remaining < Duration::seconds(7_776_000 - 119));
        assert!(remaining > Duration::seconds(7_776_000 - 130));
    }
}
