use super::progress::ProgressUI;
use super::session::{connect_simkl, load_config, load_credentials};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use media_sync_config::{ExportOptions, PathManager};
use media_sync_core::{CsvExporter, ExportPipeline, ExportReport};
use media_sync_models::{Category, EpisodelessPolicy};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;

fn apply_overrides(
    options: &mut ExportOptions,
    categories: Vec<Category>,
    path: Option<PathBuf>,
    episodeless: Option<EpisodelessPolicy>,
) {
    if !categories.is_empty() {
        options.categories = categories;
    }
    if let Some(path) = path {
        options.path = path;
    }
    if let Some(policy) = episodeless {
        options.episodeless = policy;
    }
}

pub async fn run_export(
    categories: Vec<Category>,
    path: Option<PathBuf>,
    episodeless: Option<EpisodelessPolicy>,
    output: &Output,
) -> Result<()> {
    tracing::debug!("Export command started");

    let path_manager = PathManager::default();
    let mut config = load_config(&path_manager)?;
    apply_overrides(&mut config.export, categories, path, episodeless);
    config.validate_for_export()?;

    let options = config.export.clone();
    let mut cred_store = load_credentials(&path_manager)?;
    let simkl = connect_simkl(&config, &mut cred_store, config.migration.request_timeout()).await?;

    let ui = ProgressUI::new(output.is_human() && !output.is_quiet());
    ui.set_message("Fetching completed history from Simkl...".to_string());
    let pipeline = ExportPipeline::new(simkl).with_episodeless_policy(options.episodeless);
    let report = pipeline.run(&options.categories).await;
    ui.finish();

    let written = CsvExporter::write(&options.path, &report.rows)
        .map_err(|e| eyre!("Failed to write {}: {}", options.path.display(), e))?;

    if output.is_human() {
        print_report(&report, output);
        output.success(format!("Exported {} rows to {}", written, options.path.display()));
    } else {
        output.report(&json!({
            "path": options.path,
            "rows": written,
            "categories": report.categories,
        }));
    }

    if report.failed_categories() > 0 {
        return Err(eyre!("Export finished with {} failed categories", report.failed_categories()));
    }
    Ok(())
}

fn print_report(report: &ExportReport, output: &Output) {
    if output.is_quiet() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Category").add_attribute(comfy_table::Attribute::Bold),
        Cell::new("Fetched"),
        Cell::new("Rows"),
        Cell::new("Skipped (no episodes)"),
    ]);
    for category in &report.categories {
        let rows = match &category.error {
            Some(error) => format!("{} {}", "✗".red(), error),
            None => category.rows.to_string(),
        };
        table.add_row(vec![
            Cell::new(category.category.to_string()),
            Cell::new(category.fetched),
            Cell::new(rows),
            Cell::new(category.skipped_episodeless),
        ]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let mut options = ExportOptions::default();
        apply_overrides(&mut options, vec![], Some(PathBuf::from("/tmp/out.csv")), None);
        assert_eq!(options.path, PathBuf::from("/tmp/out.csv"));
        assert_eq!(options.categories, Category::ALL.to_vec());
        assert_eq!(options.episodeless, EpisodelessPolicy::Skip);

        apply_overrides(&mut options, vec![Category::Show], None, Some(EpisodelessPolicy::Include));
        assert_eq!(options.categories, vec![Category::Show]);
        assert_eq!(options.episodeless, EpisodelessPolicy::Include);
    }
}
