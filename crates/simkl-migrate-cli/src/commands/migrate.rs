use super::progress::ProgressUI;
use super::session::{connect_simkl, connect_trakt, load_config, load_credentials};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use media_sync_config::{MigrationOptions, PathManager};
use media_sync_core::{BatchStatus, BatchUploader, MigrationPipeline, MigrationReport};
use media_sync_models::{Category, EpisodelessPolicy};
use owo_colors::OwoColorize;

/// Command-line values that take precedence over the [migration] config section
#[derive(Debug, Default)]
pub struct MigrateOverrides {
    pub categories: Vec<Category>,
    pub dry_run: bool,
    pub batch_size: Option<usize>,
    pub cooldown_ms: Option<u64>,
    pub episodeless: Option<EpisodelessPolicy>,
}

impl MigrateOverrides {
    fn apply(&self, options: &mut MigrationOptions) {
        if !self.categories.is_empty() {
            options.categories = self.categories.clone();
        }
        if let Some(batch_size) = self.batch_size {
            options.batch_size = batch_size;
        }
        if let Some(cooldown_ms) = self.cooldown_ms {
            options.cooldown_ms = cooldown_ms;
        }
        if let Some(policy) = self.episodeless {
            options.episodeless = policy;
        }
    }
}

pub async fn run_migrate(overrides: MigrateOverrides, output: &Output) -> Result<()> {
    tracing::debug!("Migrate command started");

    let path_manager = PathManager::default();
    let mut config = load_config(&path_manager)?;
    overrides.apply(&mut config.migration);
    config.validate_for_migration()?;

    let options = config.migration.clone();
    let timeout = options.request_timeout();

    let mut cred_store = load_credentials(&path_manager)?;
    let simkl = connect_simkl(&config, &mut cred_store, timeout).await?;
    let trakt = connect_trakt(&config, &mut cred_store, timeout).await?;

    let uploader = BatchUploader::new(trakt)
        .with_batch_size(options.batch_size)
        .with_cooldown(options.cooldown());
    let mut pipeline = MigrationPipeline::new(simkl, uploader).with_episodeless_policy(options.episodeless);
    if overrides.dry_run {
        pipeline = pipeline.with_dry_run(path_manager.dry_run_dir());
    }

    let ui = ProgressUI::new(output.is_human() && !output.is_quiet());
    let report = pipeline
        .run_with_progress(&options.categories, |category| {
            ui.set_message(format!("Migrating {}...", category));
        })
        .await;
    ui.finish();

    if output.is_human() {
        print_report(&report, output);
    } else {
        output.report(&report);
    }

    if report.failed_categories() > 0 || report.failed_batches() > 0 {
        return Err(eyre!(
            "Migration finished with {} failed categories and {} failed batches",
            report.failed_categories(),
            report.failed_batches()
        ));
    }

    Ok(())
}

fn print_report(report: &MigrationReport, output: &Output) {
    if output.is_quiet() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Category").add_attribute(comfy_table::Attribute::Bold),
        Cell::new("Fetched"),
        Cell::new("Records"),
        Cell::new("No IDs"),
        Cell::new("Skipped"),
        Cell::new("Invalid"),
        Cell::new("Batches"),
        Cell::new(if report.dry_run { "Planned" } else { "Added (movies/shows/episodes)" }),
    ]);

    for category in &report.categories {
        let batches = match &category.upload {
            Some(upload) if upload.failed_batches() > 0 => format!(
                "{} ({} failed)",
                upload.batches.len(),
                upload.failed_batches()
            ),
            Some(upload) => upload.batches.len().to_string(),
            None => category.planned_batches.to_string(),
        };
        let result = if let Some(error) = &category.error {
            format!("{} {}", "✗".red(), error)
        } else if report.dry_run {
            format!("{} records", category.records)
        } else {
            let added = category.added();
            format!("{}/{}/{}", added.movies, added.shows, added.episodes)
        };

        table.add_row(vec![
            Cell::new(category.category.to_string()),
            Cell::new(category.fetched),
            Cell::new(category.records),
            Cell::new(category.discarded_without_ids),
            Cell::new(category.skipped_episodeless),
            Cell::new(category.transform_failures.len()),
            Cell::new(batches),
            Cell::new(result),
        ]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);

    for category in &report.categories {
        for failure in &category.transform_failures {
            output.warn(format!("{}: {}", category.category, failure));
        }
        let failed = category.upload.iter().flat_map(|u| u.batches.iter());
        for batch in failed {
            if let BatchStatus::Failed { error } = &batch.status {
                output.warn(format!(
                    "{} batch {} ({} records) was not uploaded: {}",
                    category.category, batch.index, batch.size, error
                ));
            }
        }
    }

    if report.dry_run {
        if let Some(dir) = report
            .categories
            .iter()
            .find_map(|c| c.dry_run_file.as_ref())
            .and_then(|p| p.parent())
        {
            output.info(format!("Dry-run mode: JSON files written to {}", dir.display()));
        }
        return;
    }

    let totals = report.totals();
    output.success(format!(
        "Migration completed: {} movies, {} shows and {} episodes added to Trakt",
        totals.movies, totals.shows, totals.episodes
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut options = MigrationOptions::default();
        let overrides = MigrateOverrides {
            categories: vec![Category::Anime],
            batch_size: Some(10),
            episodeless: Some(EpisodelessPolicy::Skip),
            ..Default::default()
        };
        overrides.apply(&mut options);

        assert_eq!(options.categories, vec![Category::Anime]);
        assert_eq!(options.batch_size, 10);
        assert_eq!(options.cooldown_ms, 1000);
        assert_eq!(options.episodeless, EpisodelessPolicy::Skip);
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut options = MigrationOptions::default();
        MigrateOverrides::default().apply(&mut options);
        assert_eq!(options.categories, Category::ALL.to_vec());
        assert_eq!(options.batch_size, 50);
    }
}
