pub mod category;
pub mod source_item;
pub mod destination;
pub mod export_row;
pub mod policy;

pub use category::{Category, UnknownCategory};
pub use source_item::{EpisodeRecord, SourceItem};
pub use destination::{AddedCounts, DestinationIds, DestinationRecord, HistoryPayload};
pub use export_row::{ExportRow, EXPORT_COLUMNS};
pub use policy::EpisodelessPolicy;
