use crate::SourceError;
use async_trait::async_trait;
use media_sync_models::{AddedCounts, Category, HistoryPayload, SourceItem};

/// A service the completed watch history is read from
#[async_trait]
pub trait CompletedItemsSource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Fetch every completed item of one category, normalized into `SourceItem`s.
    ///
    /// One network call, no retry. Order follows the service's response.
    async fn fetch_completed(&self, category: Category) -> Result<Vec<SourceItem>, SourceError>;
}

/// A service watch history is appended to
#[async_trait]
pub trait HistoryDestination: Send + Sync {
    fn destination_name(&self) -> &str;

    /// Submit one batch and return what the service reports as newly added
    async fn add_to_history(&self, payload: &HistoryPayload) -> Result<AddedCounts, SourceError>;
}

/// Obtains an OAuth authorization code from the user.
///
/// The library only builds the authorization URL and exchanges the code;
/// showing the URL and reading the code back is up to the caller.
pub trait AuthorizationPrompt: Send + Sync {
    fn authorization_code(&self, service: &str, authorize_url: &str) -> anyhow::Result<String>;
}
