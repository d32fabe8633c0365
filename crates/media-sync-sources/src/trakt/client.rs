use crate::http::create_client;
use crate::trakt::{api, auth};
use crate::traits::HistoryDestination;
use crate::{AuthorizationPrompt, SourceError};
use async_trait::async_trait;
use media_sync_config::{CredentialStore, TraktConfig};
use media_sync_models::{AddedCounts, HistoryPayload};
use reqwest::Client;
use std::time::Duration;

/// Write side of a migration: the user's Trakt watch history
#[derive(Clone)]
pub struct TraktClient {
    client: Client,
    config: TraktConfig,
    access_token: Option<String>,
}

impl TraktClient {
    pub fn new(config: TraktConfig, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: create_client(timeout)?,
            config,
            access_token: None,
        })
    }

    pub async fn authenticate(
        &mut self,
        store: &mut CredentialStore,
        prompt: &dyn AuthorizationPrompt,
    ) -> Result<(), SourceError> {
        let token = auth::authenticate(&self.client, &self.config, store, prompt).await?;
        self.access_token = Some(token);
        Ok(())
    }

    fn access_token(&self) -> Result<&str, SourceError> {
        self.access_token.as_deref().ok_or(SourceError::NotAuthenticated("trakt"))
    }
}

#[async_trait]
impl HistoryDestination for TraktClient {
    fn destination_name(&self) -> &str {
        "trakt"
    }

    async fn add_to_history(&self, payload: &HistoryPayload) -> Result<AddedCounts, SourceError> {
        let access_token = self.access_token()?;
        let response = api::add_to_history(
            &self.client,
            &self.config.api_url,
            access_token,
            &self.config.client_id,
            payload,
        )
        .await?;
        Ok(response.added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_requires_session() {
        let config = TraktConfig::new("id".to_string(), "secret".to_string());
        let client = TraktClient::new(config, Duration::from_secs(5)).unwrap();

        let err = client.add_to_history(&HistoryPayload::default()).await.unwrap_err();
        assert!(matches!(err, SourceError::NotAuthenticated("trakt")));
    }
}
