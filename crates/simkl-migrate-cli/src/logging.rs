use anyhow::Result;
use media_sync_config::LoggingConfig;
use std::io;
use std::io::IsTerminal;
use std::path::Path;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Filter directives for the verbosity flags.
///
/// 0 = info, 1 = debug (with hyper connection noise suppressed), 2+ = trace.
/// `RUST_LOG` wins unless `quiet` is set.
fn build_filter(verbose_level: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    let default = match verbose_level {
        0 => "info",
        1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// JSON output: config setting, then `RUST_LOG_JSON`, then "stdout is not a terminal"
fn use_json(config: &LoggingConfig) -> bool {
    if let Some(json) = config.json {
        return json;
    }
    std::env::var("RUST_LOG_JSON")
        .map(|v| v == "true")
        .unwrap_or_else(|_| !io::stdout().is_terminal())
}

/// Split `logs/simkl-migrate.log` into the directory and the rotation prefix `simkl-migrate`
fn rolling_parts(log_path: &Path) -> Result<(&Path, &str)> {
    let log_dir = log_path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let log_filename = log_path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename: {}", log_path.display()))?;
    let log_prefix = log_filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(log_filename);
    Ok((log_dir, log_prefix))
}

pub fn init_logging(verbose_level: u8, quiet: bool, config: &LoggingConfig) -> Result<()> {
    let json = use_json(config);
    let registry = Registry::default().with(build_filter(verbose_level, quiet));

    if let Some(log_path) = &config.file {
        let (log_dir, log_prefix) = rolling_parts(log_path)?;
        std::fs::create_dir_all(log_dir)?;

        // Files are named simkl-migrate.2026-01-17 and so on
        let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix);

        if json {
            let json_layer = fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(file_appender);

            registry.with(json_layer).init();
        } else {
            let fmt_layer = fmt::layer()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(file_appender);

            registry.with(fmt_layer).init();
        }
    } else if json {
        let json_layer = fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);

        registry.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);

        registry.with(fmt_layer).init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_parts() {
        let (dir, prefix) = rolling_parts(Path::new("/var/log/simkl-migrate.log")).unwrap();
        assert_eq!(dir, Path::new("/var/log"));
        assert_eq!(prefix, "simkl-migrate");

        let (dir, prefix) = rolling_parts(Path::new("migrate")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(prefix, "migrate");
    }

    #[test]
    fn test_config_forces_json_setting() {
        let config = LoggingConfig { file: None, json: Some(false) };
        assert!(!use_json(&config));
        let config = LoggingConfig { file: None, json: Some(true) };
        assert!(use_json(&config));
    }
}
