use super::prompts::{self, TerminalPrompt};
use super::session::load_credentials;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use media_sync_config::{Config, PathManager, SimklConfig, TraktConfig, DEFAULT_SIMKL_REDIRECT_URI};
use media_sync_models::EpisodelessPolicy;
use media_sync_sources::{SimklClient, TraktClient};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, output),
        ConfigCommands::Simkl { client_id, client_secret, redirect_uri } => {
            configure_simkl(client_id, client_secret, redirect_uri, output).await
        }
        ConfigCommands::Trakt { client_id, client_secret } => configure_trakt(client_id, client_secret, output).await,
        ConfigCommands::Options { batch_size, cooldown_ms, request_timeout_secs, export_path } => {
            configure_options(batch_size, cooldown_ms, request_timeout_secs, export_path, output)
        }
    }
}

fn styled_table(title: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(title).fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold)
    ]);
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn policy_label(policy: EpisodelessPolicy) -> &'static str {
    match policy {
        EpisodelessPolicy::Include => "include",
        EpisodelessPolicy::Skip => "skip",
    }
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Configuration will be created when you run 'simkl-migrate config simkl' or 'simkl-migrate config trakt'.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let secret = |s: &str| if full { s.to_string() } else { mask_string(s) };

    if !output.is_human() {
        output.report(&json!({
            "config_file": config_file,
            "simkl": config.simkl.as_ref().map(|s| json!({
                "client_id": secret(&s.client_id),
                "client_secret": secret(&s.client_secret),
                "redirect_uri": s.redirect_uri,
                "api_url": s.api_url,
            })),
            "trakt": config.trakt.as_ref().map(|t| json!({
                "client_id": secret(&t.client_id),
                "client_secret": secret(&t.client_secret),
                "api_url": t.api_url,
            })),
            "migration": config.migration,
            "export": config.export,
            "logging": config.logging,
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    let mut info_table = Table::new();
    info_table.set_header(vec![
        Cell::new("Config File").add_attribute(comfy_table::Attribute::Bold),
        Cell::new(config_file.display().to_string())
    ]);
    info_table.load_preset(comfy_table::presets::UTF8_FULL);
    info_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", info_table);
    println!();

    match &config.simkl {
        Some(simkl) => {
            let mut table = styled_table("Simkl (source)");
            table.add_row(vec![Cell::new("Client ID"), Cell::new(secret(&simkl.client_id))]);
            table.add_row(vec![Cell::new("Client Secret"), Cell::new(secret(&simkl.client_secret))]);
            table.add_row(vec![Cell::new("Redirect URI"), Cell::new(&simkl.redirect_uri)]);
            table.add_row(vec![Cell::new("API"), Cell::new(&simkl.api_url)]);
            println!("{}\n", table);
        }
        None => println!("{}\n", "Simkl: Not configured".bright_black()),
    }

    match &config.trakt {
        Some(trakt) => {
            let mut table = styled_table("Trakt (destination)");
            table.add_row(vec![Cell::new("Client ID"), Cell::new(secret(&trakt.client_id))]);
            table.add_row(vec![Cell::new("Client Secret"), Cell::new(secret(&trakt.client_secret))]);
            table.add_row(vec![Cell::new("API"), Cell::new(&trakt.api_url)]);
            println!("{}\n", table);
        }
        None => println!("{}\n", "Trakt: Not configured".bright_black()),
    }

    let categories = |c: &[media_sync_models::Category]| {
        c.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
    };

    let mut migration = styled_table("Migration");
    migration.add_row(vec![Cell::new("Categories"), Cell::new(categories(&config.migration.categories))]);
    migration.add_row(vec![Cell::new("Batch size"), Cell::new(config.migration.batch_size)]);
    migration.add_row(vec![Cell::new("Cooldown"), Cell::new(format!("{} ms", config.migration.cooldown_ms))]);
    migration.add_row(vec![Cell::new("Request timeout"), Cell::new(format!("{} s", config.migration.request_timeout_secs))]);
    migration.add_row(vec![Cell::new("Shows without episodes"), Cell::new(policy_label(config.migration.episodeless))]);
    println!("{}\n", migration);

    let mut export = styled_table("Export");
    export.add_row(vec![Cell::new("Path"), Cell::new(config.export.path.display().to_string())]);
    export.add_row(vec![Cell::new("Categories"), Cell::new(categories(&config.export.categories))]);
    export.add_row(vec![Cell::new("Shows without episodes"), Cell::new(policy_label(config.export.episodeless))]);
    println!("{}\n", export);

    if let Some(file) = &config.logging.file {
        println!("Logging to {}", file.display().bright_green());
    }

    Ok(())
}

/// Existing config, or defaults when there is no file yet
fn load_or_create_config(path_manager: &PathManager, output: &Output) -> Result<(PathBuf, Config)> {
    path_manager.ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    if !config_file.exists() {
        output.info("Configuration file not found. Creating default configuration...");
    }
    let config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    Ok((config_file, config))
}

fn save_config(config: &Config, config_file: &PathBuf) -> Result<()> {
    config.save_to_file(config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))
}

/// Client ID from the flag, or prompted (pre-filled with a usable existing value)
fn resolve_client_id(arg: Option<String>, service: &str, existing: Option<&str>, help_url: &str, output: &Output) -> Result<String> {
    if let Some(id) = arg {
        validate_client_id(&id).map_err(|e| eyre!("Invalid {} Client ID: {}", service, e))?;
        return Ok(id);
    }
    let existing = existing.filter(|s| !s.is_empty() && *s != "YOUR_CLIENT_ID");
    loop {
        let input = prompts::prompt_string(&format!("{} Client ID", service), existing)?;
        match validate_client_id(&input) {
            Ok(()) => break Ok(input),
            Err(e) => {
                output.error(format!("Validation error: {}", e));
                output.info(format!("You can find your Client ID at: {}", help_url));
            }
        }
    }
}

fn resolve_client_secret(arg: Option<String>, service: &str, has_existing: bool, output: &Output) -> Result<String> {
    if let Some(secret) = arg {
        validate_secret(&secret).map_err(|e| eyre!("Invalid {} Client Secret: {}", service, e))?;
        return Ok(secret);
    }
    loop {
        let mut password_prompt = dialoguer::Password::new()
            .with_prompt(format!("{} Client Secret", service));

        // Only ask for confirmation on a first-time setup
        if !has_existing {
            password_prompt = password_prompt.with_confirmation(
                format!("Confirm {} Client Secret", service),
                "Secrets do not match",
            );
        }

        let input = password_prompt
            .interact()
            .map_err(|e| eyre!("Failed to read secret: {}", e))?;
        match validate_secret(&input) {
            Ok(()) => break Ok(input),
            Err(e) => {
                output.error(format!("Validation error: {}", e));
                output.info("The Client Secret will be hidden as you type for security.");
            }
        }
    }
}

async fn configure_simkl(
    client_id_arg: Option<String>,
    client_secret_arg: Option<String>,
    redirect_uri_arg: Option<String>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    let (config_file, mut config) = load_or_create_config(&path_manager, output)?;

    print_section_header("Simkl API Setup", output);
    output.println("");
    output.println("Follow the instructions to set up your Simkl API application:");
    print_instruction_list(&[
        "Login to Simkl and open https://simkl.com/settings/developer/new/",
        "Create a new application named 'simkl-migrate'",
        "Set the redirect URI to http://localhost:3000 (the page does not need to load)",
    ], output);
    output.println("");

    let existing = config.simkl.clone();
    let client_id = resolve_client_id(
        client_id_arg,
        "Simkl",
        existing.as_ref().map(|s| s.client_id.as_str()),
        "https://simkl.com/settings/developer/",
        output,
    )?;
    let client_secret = resolve_client_secret(client_secret_arg, "Simkl", existing.is_some(), output)?;

    let mut simkl_config = existing.unwrap_or_else(|| SimklConfig::new(String::new(), String::new()));
    simkl_config.client_id = client_id;
    simkl_config.client_secret = client_secret;
    simkl_config.redirect_uri = redirect_uri_arg.unwrap_or_else(|| {
        if simkl_config.redirect_uri.is_empty() {
            DEFAULT_SIMKL_REDIRECT_URI.to_string()
        } else {
            simkl_config.redirect_uri.clone()
        }
    });
    config.simkl = Some(simkl_config.clone());
    save_config(&config, &config_file)?;

    // New credentials invalidate any saved session
    let mut cred_store = load_credentials(&path_manager)?;
    cred_store.clear_service("simkl");

    output.println("");
    print_oauth_progress("Starting Simkl OAuth authentication...", output);
    let mut client = SimklClient::new(simkl_config, config.migration.request_timeout())?;
    client.authenticate(&mut cred_store, &TerminalPrompt)
        .await
        .map_err(|e| eyre!("Simkl OAuth authentication failed: {}", e))?;

    output.println("");
    output.success("Simkl authentication successful!");
    Ok(())
}

async fn configure_trakt(client_id_arg: Option<String>, client_secret_arg: Option<String>, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let (config_file, mut config) = load_or_create_config(&path_manager, output)?;

    print_section_header("Trakt API Setup", output);
    output.println("");
    output.println("Follow the instructions to set up your Trakt API application:");
    print_instruction_list(&[
        "Login to Trakt and open https://trakt.tv/oauth/applications/new",
        "Create a new application named 'simkl-migrate'",
        "Use urn:ietf:wg:oauth:2.0:oob as the redirect URI",
    ], output);
    output.println("");

    let existing = config.trakt.clone();
    let client_id = resolve_client_id(
        client_id_arg,
        "Trakt",
        existing.as_ref().map(|t| t.client_id.as_str()),
        "https://trakt.tv/oauth/applications",
        output,
    )?;
    let client_secret = resolve_client_secret(client_secret_arg, "Trakt", existing.is_some(), output)?;

    let mut trakt_config = existing.unwrap_or_else(|| TraktConfig::new(String::new(), String::new()));
    trakt_config.client_id = client_id;
    trakt_config.client_secret = client_secret;
    config.trakt = Some(trakt_config.clone());
    save_config(&config, &config_file)?;

    let mut cred_store = load_credentials(&path_manager)?;
    cred_store.clear_service("trakt");

    output.println("");
    print_oauth_progress("Starting Trakt OAuth authentication...", output);
    let mut client = TraktClient::new(trakt_config, config.migration.request_timeout())?;
    client.authenticate(&mut cred_store, &TerminalPrompt)
        .await
        .map_err(|e| eyre!("Trakt OAuth authentication failed: {}", e))?;

    output.println("");
    output.success("Trakt authentication successful!");
    if let Some(expires_at) = cred_store.get_trakt_token_expires() {
        output.println(format!("  Access token expires at: {}", expires_at.to_rfc3339().bright_green()));
    }
    Ok(())
}

fn configure_options(
    batch_size: Option<usize>,
    cooldown_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    export_path: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    let (config_file, mut config) = load_or_create_config(&path_manager, output)?;
    let interactive = batch_size.is_none() && cooldown_ms.is_none() && request_timeout_secs.is_none() && export_path.is_none();

    if interactive {
        print_section_header("Migration Options", output);
        output.println("");
        output.println("Trakt rate-limits writes; smaller batches and a longer cooldown are gentler.");
        output.println("");

        config.migration.batch_size = loop {
            let size = prompts::prompt_number("Records per upload request", config.migration.batch_size)?;
            if size > 0 {
                break size;
            }
            output.error("Batch size must be at least 1");
        };
        config.migration.cooldown_ms = prompts::prompt_number("Pause after each request (ms)", config.migration.cooldown_ms)?;
        config.migration.request_timeout_secs =
            prompts::prompt_number("HTTP request timeout (seconds)", config.migration.request_timeout_secs)?;

        output.println("");
        output.println("Some completed shows arrive from Simkl without per-episode data.");
        let upload_episodeless = prompts::prompt_yes_no(
            "Upload such shows to Trakt anyway (without episode detail)?",
            Some(config.migration.episodeless == EpisodelessPolicy::Include),
        )?;
        config.migration.episodeless = if upload_episodeless { EpisodelessPolicy::Include } else { EpisodelessPolicy::Skip };

        let export_episodeless = prompts::prompt_yes_no(
            "Write one CSV row for such shows when exporting?",
            Some(config.export.episodeless == EpisodelessPolicy::Include),
        )?;
        config.export.episodeless = if export_episodeless { EpisodelessPolicy::Include } else { EpisodelessPolicy::Skip };

        let current_path = config.export.path.display().to_string();
        let path = prompts::prompt_string("CSV export path", Some(&current_path))?;
        if !path.trim().is_empty() {
            config.export.path = PathBuf::from(path.trim());
        }
    } else {
        if let Some(size) = batch_size {
            config.migration.batch_size = size;
        }
        if let Some(ms) = cooldown_ms {
            config.migration.cooldown_ms = ms;
        }
        if let Some(secs) = request_timeout_secs {
            config.migration.request_timeout_secs = secs;
        }
        if let Some(path) = export_path {
            config.export.path = path;
        }
    }

    if config.migration.batch_size == 0 {
        return Err(eyre!("batch_size must be at least 1"));
    }

    save_config(&config, &config_file)?;
    output.success("Options saved!");
    Ok(())
}

fn mask_string(s: &str) -> String {
    if s.is_empty() || s == "YOUR_CLIENT_ID" || s == "YOUR_CLIENT_SECRET" {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn validate_client_id(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("Client ID cannot be empty");
    }
    if input.len() < 10 {
        return Err("Client ID seems too short. Please verify it's correct.");
    }
    Ok(())
}

fn validate_secret(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("Client Secret cannot be empty");
    }
    if input.len() < 6 {
        return Err("Client Secret seems too short. Please verify it's correct.");
    }
    Ok(())
}

// Formatting helpers

fn print_section_header(title: &str, output: &Output) {
    output.println("");
    output.println(format!("{}", title.bold().bright_cyan()));
    output.println(format!("{}", "─".repeat(title.len()).bright_cyan()));
}

fn print_instruction_list(items: &[&str], output: &Output) {
    for (idx, item) in items.iter().enumerate() {
        output.println(format!("  {}. {}", idx + 1, item));
    }
}

fn print_oauth_progress(message: &str, output: &Output) {
    output.println(format!("{} {}", "→".bright_blue(), message.bright_white()));
}
