use serde::{Deserialize, Serialize};

/// Header of the history export file, in column order
pub const EXPORT_COLUMNS: [&str; 10] = [
    "Type", "Title", "Year", "Season", "Episode", "WatchedAt", "IMDB", "TMDB", "TVDB", "SimklID",
];

/// One row of the flat history export.
///
/// Movies produce one row each; shows and anime produce one row per watched
/// episode. Absent values are written as empty cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRow {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<u32>,
    #[serde(rename = "Season")]
    pub season: Option<u32>,
    #[serde(rename = "Episode")]
    pub episode: Option<u32>,
    #[serde(rename = "WatchedAt")]
    pub watched_at: Option<String>,
    #[serde(rename = "IMDB")]
    pub imdb: Option<String>,
    #[serde(rename = "TMDB")]
    pub tmdb: Option<String>,
    #[serde(rename = "TVDB")]
    pub tvdb: Option<String>,
    #[serde(rename = "SimklID")]
    pub simkl_id: Option<String>,
}
