pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, ConfigError, ExportOptions, LoggingConfig, MigrationOptions, SimklConfig, TraktConfig, DEFAULT_SIMKL_API_URL, DEFAULT_SIMKL_REDIRECT_URI, DEFAULT_TRAKT_API_URL};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};
