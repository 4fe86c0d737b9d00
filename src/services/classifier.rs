use lazy_static::lazy_static;
use regex::Regex;

use crate::models::MediaKind;

/// Adult keywords, matched case-insensitively as substrings of the title or
/// the category. Extend here; nothing else needs to change.
pub const ADULT_KEYWORDS: &[&str] = &[
    "adult",
    "adulto",
    "porn",
    "porno",
    "pornô",
    "xxx",
    "sex",
    "sexo",
    "erótico",
    "erotico",
    "18+",
    "hentai",
    "onlyfans",
    "camgirl",
];

/// Separator between title and URL in item ids
pub const ITEM_ID_SEPARATOR: &str = "::";

lazy_static! {
    // ============ SPECIAL PATTERNS ============
    static ref ADULT_CONTENT: Regex = Regex::new(&format!(
        "(?i){}",
        ADULT_KEYWORDS
            .iter()
            .map(|kw| regex::escape(kw))
            .collect::<Vec<_>>()
            .join("|")
    ))
    .unwrap();

    // ============ TITLE PATTERNS ============
    // Order matters: first match wins
    static ref TITLE_SERIES_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\s[Ss]\d{1,2}[Ee]\d{1,2}").unwrap(),
        Regex::new(r"\s\d{1,2}[xX]\d{1,2}").unwrap(),
        Regex::new(r"(?i)temporada\s*\d+").unwrap(),
        Regex::new(r"(?i)season\s*\d+").unwrap(),
    ];

    // ============ NORMALIZERS ============
    static ref FOUR_K_MARKER: Regex = Regex::new(r"(?i)\s*[\(\[]?\b4k\b[\)\]]?").unwrap();
    static ref MULTI_SPACE: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// Outcome of classifying one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_adult: bool,
    pub is_series: bool,
}

impl Classification {
    /// Resolve the media kind, falling back to the upload's declared kind
    pub fn media_kind(&self, default_kind: MediaKind) -> MediaKind {
        if self.is_series {
            MediaKind::Series
        } else {
            default_kind
        }
    }
}

/// Content classifier for playlist entries.
/// Pure functions only: no state is shared between runs.
pub struct ContentClassifier;

impl ContentClassifier {
    /// Classify an entry by title and category
    pub fn classify(title: &str, category: &str) -> Classification {
        Classification {
            is_adult: Self::is_adult(title, category),
            is_series: Self::is_series(title),
        }
    }

    /// True when title or category hits any adult keyword
    pub fn is_adult(title: &str, category: &str) -> bool {
        ADULT_CONTENT.is_match(title) || ADULT_CONTENT.is_match(category)
    }

    /// True when the title carries a season/episode marker
    pub fn is_series(title: &str) -> bool {
        TITLE_SERIES_PATTERNS.iter().any(|p| p.is_match(title))
    }

    /// Dedup key for movies: 4K marker removed, whitespace collapsed, lowercased.
    /// A title that is nothing but the marker keeps it, so it never maps to "".
    pub fn dedup_key(title: &str) -> String {
        let stripped = FOUR_K_MARKER.replace_all(title, "");
        let source = if stripped.trim().is_empty() {
            title
        } else {
            stripped.as_ref()
        };
        MULTI_SPACE.replace_all(source.trim(), " ").to_lowercase()
    }

    /// True when the original title mentions 4K in any form
    pub fn is_4k(title: &str) -> bool {
        title.to_lowercase().contains("4k")
    }

    /// Deterministic item id from title and URL
    pub fn item_id(title: &str, url: &str) -> String {
        format!("{}{}{}", title, ITEM_ID_SEPARATOR, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_adult() {
        assert!(ContentClassifier::classify("Hot XXX Movie", "Filmes").is_adult);
        assert!(ContentClassifier::classify("Inocente", "ADULTOS").is_adult);
        assert!(ContentClassifier::classify("Canal", "+18 | Hentai").is_adult);
        assert!(ContentClassifier::classify("Filme PORNÔ", "VOD").is_adult);
        assert!(ContentClassifier::classify("Show 18+", "Extras").is_adult);
        assert!(!ContentClassifier::classify("Matrix (1999)", "Ação").is_adult);
    }

    #[test]
    fn test_classify_series() {
        assert!(ContentClassifier::classify("Breaking Bad S01E01", "Series").is_series);
        assert!(ContentClassifier::classify("Game of Thrones 1x01", "HBO").is_series);
        assert!(ContentClassifier::classify("Dark Temporada 2", "Netflix").is_series);
        assert!(ContentClassifier::classify("The Office season 3", "TV").is_series);
        assert!(ContentClassifier::classify("Lost s2e5", "ABC").is_series);
    }

    #[test]
    fn test_classify_movie_titles_are_not_series() {
        assert!(!ContentClassifier::is_series("Matrix (1999)"));
        assert!(!ContentClassifier::is_series("S01E01"));
        assert!(!ContentClassifier::is_series("Avatar 2 4K 3840x2160"));
    }

    #[test]
    fn test_media_kind_defaults() {
        let movie = ContentClassifier::classify("Matrix", "Filmes");
        assert_eq!(movie.media_kind(MediaKind::Movie), MediaKind::Movie);
        assert_eq!(movie.media_kind(MediaKind::Series), MediaKind::Series);

        let episode = ContentClassifier::classify("Show Name S01E02", "Filmes");
        assert_eq!(episode.media_kind(MediaKind::Movie), MediaKind::Series);
    }

    #[test]
    fn test_dedup_key() {
        assert_eq!(ContentClassifier::dedup_key("Movie A (4K)"), "movie a");
        assert_eq!(ContentClassifier::dedup_key("  Movie A  "), "movie a");
        assert_eq!(ContentClassifier::dedup_key("Movie A 4k"), "movie a");
        assert_eq!(ContentClassifier::dedup_key("[4K] Movie A"), "movie a");
        assert_eq!(ContentClassifier::dedup_key("Movie  (4K)  A"), "movie a");
        assert_ne!(ContentClassifier::dedup_key("Movie A"), ContentClassifier::dedup_key("Movie B"));
    }

    #[test]
    fn test_dedup_key_of_marker_only_title() {
        assert_eq!(ContentClassifier::dedup_key("4K"), "4k");
        assert_eq!(ContentClassifier::dedup_key(" [4K] "), "[4k]");
        assert_ne!(ContentClassifier::dedup_key("[4K]"), ContentClassifier::dedup_key("Movie [4K]"));
        assert!(!ContentClassifier::dedup_key("(4K)").is_empty());
    }

    #[test]
    fn test_is_4k() {
        assert!(ContentClassifier::is_4k("Movie A (4K)"));
        assert!(ContentClassifier::is_4k("movie a 4k hdr"));
        assert!(!ContentClassifier::is_4k("Movie A 1080p"));
    }

    #[test]
    fn test_item_id_is_stable() {
        let a = ContentClassifier::item_id("Movie A", "http://x/1");
        let b = ContentClassifier::item_id("Movie A", "http://x/1");
        assert_eq!(a, b);
        assert_eq!(a, "Movie A::http://x/1");
        assert_ne!(a, ContentClassifier::item_id("Movie A", "http://x/2"));
    }
}
