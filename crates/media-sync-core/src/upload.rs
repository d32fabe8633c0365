use media_sync_models::{AddedCounts, Category, DestinationRecord, HistoryPayload};
use media_sync_sources::HistoryDestination;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);

/// Result of a single batch submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    Added { added: AddedCounts },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// 1-based position of the batch within its category
    pub index: usize,
    pub size: usize,
    #[serde(flatten)]
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, BatchStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub category: Category,
    pub batches: Vec<BatchOutcome>,
}

impl UploadReport {
    pub fn new(category: Category) -> Self {
        Self { category, batches: Vec::new() }
    }

    /// Sum of the counts the destination reported as added
    pub fn totals(&self) -> AddedCounts {
        let mut totals = AddedCounts::default();
        for batch in &self.batches {
            if let BatchStatus::Added { added } = &batch.status {
                totals += *added;
            }
        }
        totals
    }

    pub fn failed_batches(&self) -> usize {
        self.batches.iter().filter(|b| b.is_failed()).count()
    }

    pub fn submitted_records(&self) -> usize {
        self.batches.iter().map(|b| b.size).sum()
    }

    /// Records that were part of a batch the destination rejected
    pub fn unsent_records(&self) -> usize {
        self.batches.iter().filter(|b| b.is_failed()).map(|b| b.size).sum()
    }
}

/// Number of batches `records` splits into at a given batch size
pub fn batch_count(records: usize, batch_size: usize) -> usize {
    records.div_ceil(batch_size.max(1))
}

/// Submits records to a history destination in fixed-size batches with a
/// cooldown after every batch. A failed batch is recorded and the upload
/// moves on to the next one.
pub struct BatchUploader<D> {
    destination: D,
    batch_size: usize,
    cooldown: Duration,
}

impl<D: HistoryDestination> BatchUploader<D> {
    pub fn new(destination: D) -> Self {
        Self {
            destination,
            batch_size: DEFAULT_BATCH_SIZE,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    /// Batch size is clamped to at least one record
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub async fn upload(&self, kind: Category, records: &[DestinationRecord]) -> UploadReport {
        let mut report = UploadReport::new(kind);
        if records.is_empty() {
            info!("No {} to upload", kind);
            return report;
        }

        let total = batch_count(records.len(), self.batch_size);
        info!(
            "Uploading {} {} to {} in {} batches",
            records.len(),
            kind,
            self.destination.destination_name(),
            total
        );

        for (i, batch) in records.chunks(self.batch_size).enumerate() {
            let index = i + 1;
            let payload = HistoryPayload::for_batch(kind, batch);

            let status = match self.destination.add_to_history(&payload).await {
                Ok(added) => {
                    info!(
                        category = %kind,
                        batch = index,
                        of = total,
                        movies = added.movies,
                        shows = added.shows,
                        episodes = added.episodes,
                        "Batch uploaded"
                    );
                    BatchStatus::Added { added }
                }
                Err(e) => {
                    error!("Batch {}/{} of {} failed: {}", index, total, kind, e);
                    BatchStatus::Failed { error: e.to_string() }
                }
            };

            report.batches.push(BatchOutcome { index, size: batch.len(), status });
            tokio::time::sleep(self.cooldown).await;
        }

        report
    }
}
