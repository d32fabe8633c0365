use super::prompts::TerminalPrompt;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{Config, CredentialStore, PathManager};
use media_sync_sources::{SimklClient, TraktClient};
use std::time::Duration;

pub fn load_config(path_manager: &PathManager) -> Result<Config> {
    let config_file = path_manager.config_file();
    if !config_file.exists() {
        return Err(eyre!(
            "Configuration file not found at {}. Run 'simkl-migrate config simkl' first.",
            config_file.display()
        ));
    }
    Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

pub fn load_credentials(path_manager: &PathManager) -> Result<CredentialStore> {
    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store.load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    Ok(cred_store)
}

/// Simkl client with a session, authorizing interactively if no token is cached
pub async fn connect_simkl(config: &Config, cred_store: &mut CredentialStore, timeout: Duration) -> Result<SimklClient> {
    let simkl_config = config.simkl()?.clone();
    let mut client = SimklClient::new(simkl_config, timeout)?;
    client.authenticate(cred_store, &TerminalPrompt)
        .await
        .map_err(|e| eyre!("Simkl authentication failed: {}", e))?;
    Ok(client)
}

/// Trakt client with a session, refreshing or authorizing as needed
pub async fn connect_trakt(config: &Config, cred_store: &mut CredentialStore, timeout: Duration) -> Result<TraktClient> {
    let trakt_config = config.trakt()?.clone();
    let mut client = TraktClient::new(trakt_config, timeout)?;
    client.authenticate(cred_store, &TerminalPrompt)
        .await
        .map_err(|e| eyre!("Trakt authentication failed: {}", e))?;
    Ok(client)
}
