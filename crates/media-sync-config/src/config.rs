use media_sync_models::{Category, EpisodelessPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SIMKL_API_URL: &str = "https://api.simkl.com";
pub const DEFAULT_TRAKT_API_URL: &str = "https://api.trakt.tv";
pub const DEFAULT_SIMKL_REDIRECT_URI: &str = "http://localhost:3000";

const PLACEHOLDER_CLIENT_ID: &str = "YOUR_CLIENT_ID";
const PLACEHOLDER_CLIENT_SECRET: &str = "YOUR_CLIENT_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simkl: Option<SimklConfig>,
    #[serde(default)]
    pub trakt: Option<TraktConfig>,
    #[serde(default)]
    pub migration: MigrationOptions,
    #[serde(default)]
    pub export: ExportOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimklConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_simkl_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_simkl_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_trakt_api_url")]
    pub api_url: String,
}

/// Tuning for the fetch → transform → upload run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause after every submitted batch, in milliseconds
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    #[serde(default = "default_migration_episodeless")]
    pub episodeless: EpisodelessPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    #[serde(default = "default_export_path")]
    pub path: PathBuf,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    #[serde(default = "default_export_episodeless")]
    pub episodeless: EpisodelessPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write logs to this file (rotated daily) instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Force JSON logs on or off; by default JSON is used when stdout is not a terminal
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not configured. Run 'simkl-migrate config {0}' first")]
    MissingService(&'static str),
    #[error("{service} {field} is not configured")]
    MissingCredential { service: &'static str, field: &'static str },
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,
    #[error("at least one category must be selected")]
    NoCategories,
}

fn default_simkl_redirect_uri() -> String {
    DEFAULT_SIMKL_REDIRECT_URI.to_string()
}

fn default_simkl_api_url() -> String {
    DEFAULT_SIMKL_API_URL.to_string()
}

fn default_trakt_api_url() -> String {
    DEFAULT_TRAKT_API_URL.to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_cooldown_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

fn default_migration_episodeless() -> EpisodelessPolicy {
    EpisodelessPolicy::Include
}

fn default_export_episodeless() -> EpisodelessPolicy {
    EpisodelessPolicy::Skip
}

fn default_export_path() -> PathBuf {
    PathBuf::from("simkl_history_export.csv")
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            cooldown_ms: default_cooldown_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            categories: default_categories(),
            episodeless: default_migration_episodeless(),
        }
    }
}

impl MigrationOptions {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            path: default_export_path(),
            categories: default_categories(),
            episodeless: default_export_episodeless(),
        }
    }
}

impl SimklConfig {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri: default_simkl_redirect_uri(),
            api_url: default_simkl_api_url(),
        }
    }
}

impl TraktConfig {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            api_url: default_trakt_api_url(),
        }
    }
}

fn check_credentials(service: &'static str, client_id: &str, client_secret: &str) -> Result<(), ConfigError> {
    if client_id.is_empty() || client_id == PLACEHOLDER_CLIENT_ID {
        return Err(ConfigError::MissingCredential { service, field: "client_id" });
    }
    if client_secret.is_empty() || client_secret == PLACEHOLDER_CLIENT_SECRET {
        return Err(ConfigError::MissingCredential { service, field: "client_secret" });
    }
    Ok(())
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file, or an empty default config if it does not exist yet
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn simkl(&self) -> Result<&SimklConfig, ConfigError> {
        let simkl = self.simkl.as_ref().ok_or(ConfigError::MissingService("simkl"))?;
        check_credentials("simkl", &simkl.client_id, &simkl.client_secret)?;
        Ok(simkl)
    }

    pub fn trakt(&self) -> Result<&TraktConfig, ConfigError> {
        let trakt = self.trakt.as_ref().ok_or(ConfigError::MissingService("trakt"))?;
        check_credentials("trakt", &trakt.client_id, &trakt.client_secret)?;
        Ok(trakt)
    }

    pub fn is_simkl_configured(&self) -> bool {
        self.simkl().is_ok()
    }

    pub fn is_trakt_configured(&self) -> bool {
        self.trakt().is_ok()
    }

    /// Everything a migration run needs: both services and sane batching
    pub fn validate_for_migration(&self) -> Result<(), ConfigError> {
        self.simkl()?;
        self.trakt()?;
        if self.migration.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.migration.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        Ok(())
    }

    /// Export only reads from Simkl
    pub fn validate_for_export(&self) -> Result<(), ConfigError> {
        self.simkl()?;
        if self.export.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        Ok(())
    }

    /// Get list of services with usable credentials
    pub fn get_configured_services(&self) -> Vec<String> {
        let mut services = Vec::new();
        if self.is_simkl_configured() {
            services.push("simkl".to_string());
        }
        if self.is_trakt_configured() {
            services.push("trakt".to_string());
        }
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn configured() -> Config {
        Config {
            simkl: Some(SimklConfig::new("simkl_client_id".to_string(), "simkl_secret".to_string())),
            trakt: Some(TraktConfig::new("trakt_client_id".to_string(), "trakt_secret".to_string())),
            ..Config::default()
        }
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = configured();
        config.migration.batch_size = 25;
        config.migration.categories = vec![Category::Anime];

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.trakt.as_ref().unwrap().client_id, "trakt_client_id");
        assert_eq!(loaded.simkl.as_ref().unwrap().redirect_uri, DEFAULT_SIMKL_REDIRECT_URI);
        assert_eq!(loaded.migration.batch_size, 25);
        assert_eq!(loaded.migration.categories, vec![Category::Anime]);
        assert_eq!(loaded.export.episodeless, EpisodelessPolicy::Skip);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [simkl]
            client_id = "abc"
            client_secret = "def"
            "#,
        )
        .unwrap();

        assert!(config.trakt.is_none());
        assert_eq!(config.migration.batch_size, 50);
        assert_eq!(config.migration.cooldown(), Duration::from_secs(1));
        assert_eq!(config.migration.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.migration.categories, Category::ALL.to_vec());
        assert_eq!(config.migration.episodeless, EpisodelessPolicy::Include);
        assert_eq!(config.export.path, PathBuf::from("simkl_history_export.csv"));
        assert_eq!(config.simkl.unwrap().api_url, DEFAULT_SIMKL_API_URL);
    }

    #[test]
    fn test_config_validate() {
        let mut config = configured();
        assert!(config.validate_for_migration().is_ok());
        assert!(config.validate_for_export().is_ok());

        config.trakt = Some(TraktConfig::new("YOUR_CLIENT_ID".to_string(), "secret".to_string()));
        assert_eq!(
            config.validate_for_migration(),
            Err(ConfigError::MissingCredential { service: "trakt", field: "client_id" })
        );
        // Export does not need Trakt
        assert!(config.validate_for_export().is_ok());
        assert_eq!(config.get_configured_services(), vec!["simkl".to_string()]);

        let mut config = configured();
        config.migration.batch_size = 0;
        assert_eq!(config.validate_for_migration(), Err(ConfigError::ZeroBatchSize));

        let mut config = configured();
        config.export.categories.clear();
        assert_eq!(config.validate_for_export(), Err(ConfigError::NoCategories));
    }

    #[test]
    fn test_missing_service() {
        let config = Config::default();
        assert_eq!(config.validate_for_export(), Err(ConfigError::MissingService("simkl")));
        assert!(config.get_configured_services().is_empty());
    }
}
