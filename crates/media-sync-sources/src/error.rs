use thiserror::Error;

/// Failure talking to one of the remote services
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not authenticated with {0}")]
    NotAuthenticated(&'static str),

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("credential store: {0}")]
    CredentialStore(String),
}
