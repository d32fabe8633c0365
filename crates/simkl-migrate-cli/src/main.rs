use clap::{ArgAction, Parser, Subcommand};
use commands::{config, export, migrate};
use media_sync_config::{Config, PathManager};
use media_sync_models::{Category, EpisodelessPolicy};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "simkl-migrate")]
#[command(about = "Move your completed Simkl history to Trakt, or export it to CSV")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy completed Simkl history into Trakt
    #[command(long_about = "Fetch completed movies, shows and anime from Simkl and add them to your Trakt watch history in rate-limited batches. Categories default to the [migration] section of the configuration.")]
    Migrate {
        /// Categories to migrate: movie, show, anime (repeat or comma-separate)
        #[arg(long = "category", value_name = "CATEGORY", value_delimiter = ',')]
        categories: Vec<Category>,

        /// Prepare everything but write the payloads to JSON files instead of uploading
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,

        /// Records per upload request
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,

        /// Pause after every upload request, in milliseconds
        #[arg(long, value_name = "MS")]
        cooldown_ms: Option<u64>,

        /// How to treat shows and anime without episode data: include or skip
        #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
        episodeless: Option<EpisodelessPolicy>,
    },
    /// Export completed Simkl history to a CSV file
    #[command(long_about = "Fetch completed movies, shows and anime from Simkl and write one CSV row per movie and per watched episode.")]
    Export {
        /// Categories to export: movie, show, anime (repeat or comma-separate)
        #[arg(long = "category", value_name = "CATEGORY", value_delimiter = ',')]
        categories: Vec<Category>,

        /// Output file (defaults to the [export] path in the configuration)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// How to treat shows and anime without episode data: include or skip
        #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
        episodeless: Option<EpisodelessPolicy>,
    },
    /// Configure credentials and settings
    #[command(long_about = "Manage API credentials and migration options. Running without a subcommand shows the current configuration.")]
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show full configuration including masked secrets
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure Simkl API credentials and authorize access
    #[command(long_about = "Configure Simkl API credentials and perform OAuth authentication. You'll need to create a Simkl API application at https://simkl.com/settings/developer/new/ first.")]
    Simkl {
        /// Simkl Client ID (if not provided, will prompt)
        #[arg(long)]
        client_id: Option<String>,

        /// Simkl Client Secret (if not provided, will prompt)
        #[arg(long)]
        client_secret: Option<String>,

        /// Redirect URI registered with the Simkl application
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Configure Trakt API credentials and authorize access
    #[command(long_about = "Configure Trakt API credentials and perform OAuth authentication. You'll need to create a Trakt API application at https://trakt.tv/oauth/applications first.")]
    Trakt {
        /// Trakt Client ID (if not provided, will prompt)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt Client Secret (if not provided, will prompt)
        #[arg(long)]
        client_secret: Option<String>,
    },

    /// Configure migration and export options
    Options {
        /// Records per upload request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Pause after every upload request, in milliseconds
        #[arg(long)]
        cooldown_ms: Option<u64>,

        /// HTTP request timeout in seconds
        #[arg(long)]
        request_timeout_secs: Option<u64>,

        /// Default CSV export path
        #[arg(long)]
        export_path: Option<PathBuf>,
    },
}

fn parse_policy(s: &str) -> Result<EpisodelessPolicy, String> {
    match s.to_lowercase().as_str() {
        "include" => Ok(EpisodelessPolicy::Include),
        "skip" => Ok(EpisodelessPolicy::Skip),
        _ => Err(format!("Invalid policy: {}. Use 'include' or 'skip'", s)),
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Logging settings live in the config file; a broken file is reported by the command itself
    let logging_config = Config::load_or_default(&PathManager::default().config_file())
        .map(|c| c.logging)
        .unwrap_or_default();
    logging::init_logging(cli.verbose, cli.quiet, &logging_config)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Migrate { categories, dry_run, batch_size, cooldown_ms, episodeless } => {
            let overrides = migrate::MigrateOverrides { categories, dry_run, batch_size, cooldown_ms, episodeless };
            migrate::run_migrate(overrides, &output).await
        }
        Commands::Export { categories, path, episodeless } => {
            export::run_export(categories, path, episodeless, &output).await
        }
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show { full: false });
            config::run_config(cmd, &output).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_migrate_flags() {
        let cli = Cli::try_parse_from([
            "simkl-migrate",
            "migrate",
            "--category",
            "movies,anime",
            "--dry-run",
            "--batch-size",
            "25",
            "--episodeless",
            "skip",
        ])
        .unwrap();

        match cli.command {
            Commands::Migrate { categories, dry_run, batch_size, cooldown_ms, episodeless } => {
                assert_eq!(categories, vec![Category::Movie, Category::Anime]);
                assert!(dry_run);
                assert_eq!(batch_size, Some(25));
                assert_eq!(cooldown_ms, None);
                assert_eq!(episodeless, Some(EpisodelessPolicy::Skip));
            }
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn test_rejects_unknown_category() {
        assert!(Cli::try_parse_from(["simkl-migrate", "export", "--category", "books"]).is_err());
    }
}
