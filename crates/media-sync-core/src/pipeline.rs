use crate::export::TabularSink;
use crate::transform::{DestinationSink, TransformError, Transformer};
use crate::upload::{batch_count, BatchUploader, UploadReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use media_sync_models::{AddedCounts, Category, DestinationRecord, EpisodelessPolicy, ExportRow};
use media_sync_sources::{CompletedItemsSource, HistoryDestination};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// Categories in first-seen order, without repeats
fn unique_categories(categories: &[Category]) -> Vec<Category> {
    let mut seen = Vec::with_capacity(categories.len());
    for category in categories {
        if !seen.contains(category) {
            seen.push(*category);
        }
    }
    seen
}

/// Outcome of migrating one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub fetched: usize,
    pub records: usize,
    pub discarded_without_ids: usize,
    pub skipped_episodeless: usize,
    pub transform_failures: Vec<TransformError>,
    pub planned_batches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run_file: Option<PathBuf>,
    /// Set when the category could not be fetched at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryReport {
    fn new(category: Category) -> Self {
        Self {
            category,
            fetched: 0,
            records: 0,
            discarded_without_ids: 0,
            skipped_episodeless: 0,
            transform_failures: Vec::new(),
            planned_batches: 0,
            upload: None,
            dry_run_file: None,
            error: None,
        }
    }

    pub fn added(&self) -> AddedCounts {
        self.upload.as_ref().map(|u| u.totals()).unwrap_or_default()
    }

    pub fn failed_batches(&self) -> usize {
        self.upload.as_ref().map_or(0, |u| u.failed_batches())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub categories: Vec<CategoryReport>,
}

impl MigrationReport {
    pub fn totals(&self) -> AddedCounts {
        let mut totals = AddedCounts::default();
        for category in &self.categories {
            totals += category.added();
        }
        totals
    }

    pub fn failed_categories(&self) -> usize {
        self.categories.iter().filter(|c| c.error.is_some()).count()
    }

    pub fn failed_batches(&self) -> usize {
        self.categories.iter().map(|c| c.failed_batches()).sum()
    }

    /// Anything short of a clean run: a category fetch, a batch or a record failed
    pub fn has_failures(&self) -> bool {
        self.categories
            .iter()
            .any(|c| c.error.is_some() || c.failed_batches() > 0 || !c.transform_failures.is_empty())
    }
}

/// Contents of a dry-run file: what would have been uploaded for one category
#[derive(Debug, Serialize)]
struct DryRunData<'a> {
    category: Category,
    generated_at: DateTime<Utc>,
    batch_size: usize,
    planned_batches: usize,
    records: &'a [DestinationRecord],
}

fn write_dry_run_json(dir: &Path, data: &DryRunData<'_>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create dry-run directory {}", dir.display()))?;
    let path = dir.join(format!("{}.json", data.category.collection_key()));
    let json = serde_json::to_string_pretty(data).context("Failed to serialize dry-run data")?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Fetch, transform and upload completed history, one category at a time
pub struct MigrationPipeline<S, D> {
    source: S,
    uploader: BatchUploader<D>,
    transformer: Transformer<DestinationSink>,
    dry_run_dir: Option<PathBuf>,
}

impl<S: CompletedItemsSource, D: HistoryDestination> MigrationPipeline<S, D> {
    pub fn new(source: S, uploader: BatchUploader<D>) -> Self {
        Self {
            source,
            uploader,
            transformer: Transformer::new(DestinationSink::default()),
            dry_run_dir: None,
        }
    }

    pub fn with_episodeless_policy(mut self, policy: EpisodelessPolicy) -> Self {
        self.transformer = Transformer::new(DestinationSink::new(policy));
        self
    }

    /// Transform only; prepared records are written as JSON under `dir`
    /// instead of being uploaded.
    pub fn with_dry_run(mut self, dir: PathBuf) -> Self {
        self.dry_run_dir = Some(dir);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run_dir.is_some()
    }

    pub fn uploader(&self) -> &BatchUploader<D> {
        &self.uploader
    }

    pub async fn run(&self, categories: &[Category]) -> MigrationReport {
        self.run_with_progress(categories, |_| {}).await
    }

    /// Like `run`, calling `on_category` before each category starts
    pub async fn run_with_progress<F>(&self, categories: &[Category], mut on_category: F) -> MigrationReport
    where
        F: FnMut(Category),
    {
        let started_at = Utc::now();
        let mut reports = Vec::new();
        for category in unique_categories(categories) {
            on_category(category);
            reports.push(self.migrate_category(category).await);
        }
        MigrationReport {
            dry_run: self.is_dry_run(),
            started_at,
            categories: reports,
        }
    }

    #[instrument(skip(self), fields(source = self.source.source_name()))]
    pub async fn migrate_category(&self, category: Category) -> CategoryReport {
        let mut report = CategoryReport::new(category);

        let items = match self.source.fetch_completed(category).await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to fetch {}: {}", category, e);
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.fetched = items.len();

        let outcome = self.transformer.run(&items);
        report.records = outcome.records.len();
        report.discarded_without_ids = outcome.discarded_without_ids;
        report.skipped_episodeless = outcome.skipped_episodeless;
        report.transform_failures = outcome.failures;
        report.planned_batches = batch_count(outcome.records.len(), self.uploader.batch_size());

        info!(
            fetched = report.fetched,
            records = report.records,
            discarded = report.discarded_without_ids,
            failed = report.transform_failures.len(),
            "Prepared {} for upload",
            category
        );

        if let Some(dir) = &self.dry_run_dir {
            let data = DryRunData {
                category,
                generated_at: Utc::now(),
                batch_size: self.uploader.batch_size(),
                planned_batches: report.planned_batches,
                records: &outcome.records,
            };
            match write_dry_run_json(dir, &data) {
                Ok(path) => {
                    info!("Dry run: {} {} records written to {}", report.records, category, path.display());
                    report.dry_run_file = Some(path);
                }
                Err(e) => {
                    warn!("Dry run: {:#}", e);
                    report.error = Some(format!("{:#}", e));
                }
            }
            return report;
        }

        report.upload = Some(self.uploader.upload(category, &outcome.records).await);
        report
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportCategoryReport {
    pub category: Category,
    pub fetched: usize,
    pub rows: usize,
    pub skipped_episodeless: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub categories: Vec<ExportCategoryReport>,
    #[serde(skip)]
    pub rows: Vec<ExportRow>,
}

impl ExportReport {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn failed_categories(&self) -> usize {
        self.categories.iter().filter(|c| c.error.is_some()).count()
    }
}

/// Fetch completed history and flatten it into export rows
pub struct ExportPipeline<S> {
    source: S,
    transformer: Transformer<TabularSink>,
}

impl<S: CompletedItemsSource> ExportPipeline<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            transformer: Transformer::new(TabularSink::default()),
        }
    }

    pub fn with_episodeless_policy(mut self, policy: EpisodelessPolicy) -> Self {
        self.transformer = Transformer::new(TabularSink::new(policy));
        self
    }

    pub async fn run(&self, categories: &[Category]) -> ExportReport {
        let mut report = ExportReport { categories: Vec::new(), rows: Vec::new() };

        for category in unique_categories(categories) {
            let mut summary = ExportCategoryReport {
                category,
                fetched: 0,
                rows: 0,
                skipped_episodeless: 0,
                error: None,
            };

            match self.source.fetch_completed(category).await {
                Ok(items) => {
                    let outcome = self.transformer.run(&items);
                    summary.fetched = items.len();
                    summary.rows = outcome.records.len();
                    summary.skipped_episodeless = outcome.skipped_episodeless;
                    info!("Processed {} {} into {} rows", items.len(), category, summary.rows);
                    report.rows.extend(outcome.records);
                }
                Err(e) => {
                    error!("Failed to fetch {}: {}", category, e);
                    summary.error = Some(e.to_string());
                }
            }

            report.categories.push(summary);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDestination, FakeSource};
    use media_sync_models::{EpisodeRecord, SourceItem};

    fn movies(n: usize) -> Vec<SourceItem> {
        (0..n)
            .map(|i| SourceItem::new(Category::Movie).with_id("imdb", format!("tt{:07}", i)))
            .collect()
    }

    fn anime_with_episodes() -> SourceItem {
        let mut item = SourceItem::new(Category::Anime).with_title("Mushishi", Some(2005)).with_id("tmdb", "45782");
        item.episodes = (1..=3)
            .map(|n| EpisodeRecord { season: Some(1), episode: Some(n), watched_at: None })
            .collect();
        item
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_is_isolated_to_its_category() {
        let source = FakeSource::default()
            .with(Category::Movie, movies(60))
            .with(Category::Anime, vec![anime_with_episodes(), SourceItem::new(Category::Anime)]);
        let pipeline = MigrationPipeline::new(source, BatchUploader::new(FakeDestination::default()));

        let report = pipeline.run(&Category::ALL).await;
        assert_eq!(report.categories.len(), 3);

        let movie = &report.categories[0];
        assert_eq!(movie.planned_batches, 2);
        assert_eq!(movie.added().movies, 60);

        let show = &report.categories[1];
        assert_eq!(show.category, Category::Show);
        assert!(show.error.is_some());
        assert_eq!(show.records, 0);
        assert!(show.upload.is_none());

        let anime = &report.categories[2];
        assert_eq!(anime.records, 1);
        assert_eq!(anime.discarded_without_ids, 1);
        assert_eq!(anime.added().shows, 1);

        assert_eq!(report.failed_categories(), 1);
        assert!(report.has_failures());
        assert_eq!(report.totals().movies, 60);

        let calls = pipeline.uploader().destination().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].shows.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_categories_run_once() {
        let source = FakeSource::default().with(Category::Movie, movies(1));
        let pipeline = MigrationPipeline::new(source, BatchUploader::new(FakeDestination::default()));

        let mut started = Vec::new();
        let report = pipeline
            .run_with_progress(&[Category::Movie, Category::Movie], |c| started.push(c))
            .await;
        assert_eq!(started, vec![Category::Movie]);
        assert_eq!(report.categories.len(), 1);
        assert!(!report.has_failures());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_writes_records_without_uploading() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::default().with(Category::Movie, movies(120));
        let pipeline = MigrationPipeline::new(source, BatchUploader::new(FakeDestination::default()))
            .with_dry_run(dir.path().to_path_buf());

        let report = pipeline.run(&[Category::Movie]).await;
        assert!(report.dry_run);

        let movie = &report.categories[0];
        assert_eq!(movie.planned_batches, 3);
        assert!(movie.upload.is_none());
        assert!(pipeline.uploader().destination().calls().is_empty());

        let path = movie.dry_run_file.clone().unwrap();
        assert_eq!(path, dir.path().join("movies.json"));
        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["planned_batches"], 3);
        assert_eq!(written["records"].as_array().unwrap().len(), 120);
        assert_eq!(written["records"][0], serde_json::json!({"ids": {"imdb": "tt0000000"}}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_episodeless_skip_policy_for_migration() {
        let source = FakeSource::default()
            .with(Category::Show, vec![SourceItem::new(Category::Show).with_id("imdb", "tt1")]);
        let pipeline = MigrationPipeline::new(source, BatchUploader::new(FakeDestination::default()))
            .with_episodeless_policy(EpisodelessPolicy::Skip);

        let report = pipeline.run(&[Category::Show]).await;
        assert_eq!(report.categories[0].skipped_episodeless, 1);
        assert_eq!(report.categories[0].records, 0);
        assert!(pipeline.uploader().destination().calls().is_empty());
    }

    #[tokio::test]
    async fn test_export_collects_rows_across_categories() {
        let source = FakeSource::default()
            .with(Category::Movie, movies(2))
            .with(Category::Anime, vec![anime_with_episodes(), SourceItem::new(Category::Anime)]);
        let pipeline = ExportPipeline::new(source);

        let report = pipeline.run(&Category::ALL).await;
        assert_eq!(report.row_count(), 5);
        assert_eq!(report.rows[0].kind, "movie");
        assert_eq!(report.rows[4].kind, "episode");
        assert_eq!(report.rows[4].episode, Some(3));

        assert_eq!(report.failed_categories(), 1);
        assert_eq!(report.categories[2].skipped_episodeless, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("rows").is_none());
    }
}
