use serde::{Deserialize, Serialize};

/// What to do with a show or anime that arrived without per-episode data.
///
/// The migration path uploads such items as identifier-only records while the
/// export path has no row to write for them, so the two paths default to
/// different policies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EpisodelessPolicy {
    /// Emit the item anyway, without episode detail
    Include,
    /// Drop the item
    Skip,
}
