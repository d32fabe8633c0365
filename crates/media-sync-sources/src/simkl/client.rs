use crate::http::create_client;
use crate::simkl::{api, auth};
use crate::traits::CompletedItemsSource;
use crate::{AuthorizationPrompt, SourceError};
use async_trait::async_trait;
use media_sync_config::{CredentialStore, SimklConfig};
use media_sync_models::{Category, SourceItem};
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// Read side of a migration: the user's completed Simkl collections
#[derive(Clone)]
pub struct SimklClient {
    client: Client,
    config: SimklConfig,
    access_token: Option<String>,
}

impl SimklClient {
    pub fn new(config: SimklConfig, timeout: Duration) -> Result<Self, SourceError> {
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
        self.access_token.as_deref().ok_or(SourceError::NotAuthenticated("simkl"))
    }
}

#[async_trait]
impl CompletedItemsSource for SimklClient {
    fn source_name(&self) -> &str {
        "simkl"
    }

    async fn fetch_completed(&self, category: Category) -> Result<Vec<SourceItem>, SourceError> {
        let access_token = self.access_token()?;
        info!("Fetching completed {} from Simkl", category);
        let items = api::fetch_completed_items(
            &self.client,
            &self.config.api_url,
            access_token,
            &self.config.client_id,
            category,
        )
        .await?;
        info!(category = %category, items = items.len(), "Fetched Simkl collection");
        Ok(items)
    }
}
