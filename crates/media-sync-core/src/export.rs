use crate::transform::{RecordSink, TransformError};
use chrono::{DateTime, SecondsFormat, Utc};
use media_sync_models::{EpisodelessPolicy, ExportRow, SourceItem, EXPORT_COLUMNS};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode CSV row: {0}")]
    Csv(#[from] csv::Error),
}

/// Flattens items into CSV rows: one per movie, one per watched episode
#[derive(Debug, Clone)]
pub struct TabularSink {
    episodeless: EpisodelessPolicy,
}

impl TabularSink {
    pub fn new(episodeless: EpisodelessPolicy) -> Self {
        Self { episodeless }
    }
}

impl Default for TabularSink {
    fn default() -> Self {
        Self::new(EpisodelessPolicy::Skip)
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl RecordSink for TabularSink {
    type Record = ExportRow;

    fn episodeless_policy(&self) -> EpisodelessPolicy {
        self.episodeless
    }

    fn shape(&self, item: &SourceItem) -> Result<Vec<ExportRow>, TransformError> {
        let base = ExportRow {
            kind: String::new(),
            title: item.title.clone(),
            year: item.year,
            imdb: item.id_text("imdb"),
            tmdb: item.id_text("tmdb"),
            simkl_id: item.id_text("simkl"),
            ..Default::default()
        };

        if item.category.is_movie() {
            return Ok(vec![ExportRow {
                kind: "movie".to_string(),
                watched_at: format_timestamp(item.last_watched_at),
                ..base
            }]);
        }

        let tvdb = item.id_text("tvdb");
        if item.episodes.is_empty() {
            // Only reached under the include policy
            return Ok(vec![ExportRow {
                kind: item.category.descriptor_key().to_string(),
                watched_at: format_timestamp(item.last_watched_at),
                tvdb,
                ..base
            }]);
        }

        Ok(item
            .episodes
            .iter()
            .map(|ep| ExportRow {
                kind: "episode".to_string(),
                season: ep.season,
                episode: ep.episode,
                watched_at: format_timestamp(ep.watched_at),
                tvdb: tvdb.clone(),
                ..base.clone()
            })
            .collect())
    }
}

pub struct CsvExporter;

impl CsvExporter {
    /// Write the header followed by every row. The header is written even
    /// when `rows` is empty.
    pub fn write_to<W: Write>(writer: W, rows: &[ExportRow]) -> Result<usize, ExportError> {
        let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        csv_writer.write_record(EXPORT_COLUMNS)?;
        for row in rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(rows.len())
    }

    pub fn write(path: &Path, rows: &[ExportRow]) -> Result<usize, ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let written = Self::write_to(file, rows)?;
        info!("Exported {} rows to {}", written, path.display());
        Ok(written)
    }
}
