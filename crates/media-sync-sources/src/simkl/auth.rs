use crate::http::{ensure_success, read_json};
use crate::{AuthorizationPrompt, SourceError};
use media_sync_config::{CredentialStore, SimklConfig};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::info;

const AUTHORIZE_URL: &str = "https://simkl.com/oauth/authorize";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// URL the user opens to grant access
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri)
    )
}

/// Accept either the bare code or the whole redirect URL the browser landed on.
///
/// For a URL only the `code` query parameter counts.
pub fn parse_authorization_code(input: &str) -> Option<String> {
    let input = input.trim();
    let code = match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())?,
        Err(_) => input.to_string(),
    };
    Some(code).filter(|c| !c.is_empty())
}

/// Exchange an authorization code for an access token
pub async fn exchange_code(client: &Client, config: &SimklConfig, code: &str) -> Result<String, SourceError> {
    let payload = serde_json::json!({
        "code": code,
        "client_id": config.client_id,
        "client_secret": config.client_secret,
        "redirect_uri": config.redirect_uri,
        "grant_type": "authorization_code"
    });

    let response = client
        .post(format!("{}/oauth/token", config.api_url.trim_end_matches('/')))
        .header("Accept", "application/json")
        .json(&payload)
        .send()
        .await?;

    let response = ensure_success(response).await?;
    let token: TokenResponse = read_json(response).await?;
    Ok(token.access_token)
}

/// Return a usable Simkl access token, running the authorization flow when none is cached.
///
/// Simkl tokens do not expire, so a cached token is used as-is. A fresh token
/// is written back to the credential store.
pub async fn authenticate(
    client: &Client,
    config: &SimklConfig,
    store: &mut CredentialStore,
    prompt: &dyn AuthorizationPrompt,
) -> Result<String, SourceError> {
    if let Some(token) = store.get_simkl_access_token().filter(|t| !t.is_empty()) {
        info!("Using saved Simkl access token");
        return Ok(token.clone());
    }

    let url = authorize_url(&config.client_id, &config.redirect_uri);
    let input = prompt
        .authorization_code("Simkl", &url)
        .map_err(|e| SourceError::Authorization(e.to_string()))?;
    let code = parse_authorization_code(&input)
        .ok_or_else(|| SourceError::Authorization("authorization code cannot be empty".to_string()))?;

    let token = exchange_code(client, config, &code).await?;

    store.set_simkl_access_token(token.clone());
    store.save().map_err(|e| SourceError::CredentialStore(e.to_string()))?;

    info!("Authenticated to Simkl");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let url = authorize_url("abc123", "http://localhost:3000");
        assert_eq!(
            url,
            "https://simkl.com/oauth/authorize?response_type=code&client_id=abc123&redirect_uri=http%3A%2F%2Flocalhost%3A3000"
        );
    }

    #[test]
    fn test_parse_code_from_redirect_url() {
        assert_eq!(
            parse_authorization_code("http://localhost:3000/?code=XYZ&state=1").as_deref(),
            Some("XYZ")
        );
        assert_eq!(parse_authorization_code("  plaincode \n").as_deref(), Some("plaincode"));
        assert_eq!(parse_authorization_code("   "), None);
        assert_eq!(parse_authorization_code("http://localhost:3000/?code="), None);
    }

    #[test]
    fn test_parse_code_ignores_similar_parameters() {
        assert_eq!(
            parse_authorization_code("http://localhost:3000/?client_code=nope&code=XYZ").as_deref(),
            Some("XYZ")
        );
        assert_eq!(parse_authorization_code("http://localhost:3000/?client_code=nope"), None);
    }

    struct PanicPrompt;

    impl AuthorizationPrompt for PanicPrompt {
        fn authorization_code(&self, _service: &str, _url: &str) -> anyhow::Result<String> {
            panic!("cached token should be used");
        }
    }

    #[tokio::test]
    async fn test_cached_token_skips_prompt() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut store = CredentialStore::new(file.path().to_path_buf());
        store.set_simkl_access_token("cached".to_string());

        let config = SimklConfig::new("id".to_string(), "secret".to_string());
        let client = Client::new();
        let token = authenticate(&client, &config, &mut store, &PanicPrompt).await.unwrap();
        assert_eq!(token, "cached");
    }
}
