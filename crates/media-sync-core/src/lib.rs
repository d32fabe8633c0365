pub mod transform;
pub mod upload;
pub mod export;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

pub use transform::{transform, DestinationSink, RecordSink, TransformError, TransformOutcome, Transformer};
pub use upload::{BatchOutcome, BatchStatus, BatchUploader, UploadReport, DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN};
pub use export::{CsvExporter, ExportError, TabularSink};
pub use pipeline::{CategoryReport, ExportCategoryReport, ExportPipeline, ExportReport, MigrationPipeline, MigrationReport};
