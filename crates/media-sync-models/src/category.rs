use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media category of a completed item on the source service.
///
/// Simkl keeps movies, shows and anime in separate collections. Trakt only
/// knows movies and shows, so anime is uploaded as a show (see
/// [`Category::is_movie`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    Show,
    Anime,
}

impl Category {
    /// All categories in the order a full run processes them
    pub const ALL: [Category; 3] = [Category::Movie, Category::Show, Category::Anime];

    /// Path segment for `/sync/all-items/{type}` and key of the list in the response body
    pub fn collection_key(&self) -> &'static str {
        match self {
            Category::Movie => "movies",
            Category::Show => "shows",
            Category::Anime => "anime",
        }
    }

    /// Key of the nested descriptor object inside one collection entry
    pub fn descriptor_key(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Show => "show",
            Category::Anime => "anime",
        }
    }

    pub fn is_movie(&self) -> bool {
        matches!(self, Category::Movie)
    }

    /// Shows and anime carry per-episode watch data
    pub fn is_episodic(&self) -> bool {
        !self.is_movie()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected movie, show or anime)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(Category::Movie),
            "show" | "shows" | "tv" => Ok(Category::Show),
            "anime" => Ok(Category::Anime),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_aliases() {
        assert_eq!("movies".parse::<Category>().unwrap(), Category::Movie);
        assert_eq!("Show".parse::<Category>().unwrap(), Category::Show);
        assert_eq!(" anime ".parse::<Category>().unwrap(), Category::Anime);
        assert!("music".parse::<Category>().is_err());
    }

    #[test]
    fn test_anime_is_not_a_movie() {
        assert!(Category::Anime.is_episodic());
        assert!(!Category::Anime.is_movie());
        assert_eq!(Category::Anime.collection_key(), "anime");
        assert_eq!(Category::Show.descriptor_key(), "show");
    }
}
