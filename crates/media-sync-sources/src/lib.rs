pub mod traits;
pub mod http;
pub mod trakt;
pub mod simkl;
pub mod error;

pub use traits::{AuthorizationPrompt, CompletedItemsSource, HistoryDestination};
pub use error::SourceError;
pub use simkl::SimklClient;
pub use trakt::TraktClient;
