//! Episode classification.
//!
//! The upstream feed mixes several shows into one stream. Each show is
//! recognised by markers the publisher puts into episode titles, so the
//! rules below are constants of that naming convention rather than settings.

use std::fmt;
use std::str::FromStr;

/// Marker carried by every "СДЗ" episode.
const SDZ_MARKER: &str = "СДЗ";
/// Title prefix of the lore show. The trailing space is significant.
const KABINET_LORA_PREFIX: &str = "Кабинет Лора ";
/// A lore episode that was published under the main show's naming.
const KABINET_LORA_SPECIAL: &str = "Завтракаст Special - Про Warhammer 40k";
/// Marker carried by photography episodes.
const PHOTO_MARKER: &str = "Фотодушнила";

/// One of the fixed output partitions of the source feed.
///
/// `Zavtracast` is the catch-all: anything that matches no other rule lands there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Sdz,
    KabinetLora,
    Photo,
    Zavtracast,
}

impl Category {
    /// All categories, in routing order.
    pub const ALL: [Category; 4] = [
        Category::Sdz,
        Category::KabinetLora,
        Category::Photo,
        Category::Zavtracast,
    ];

    /// Stable identifier used in URLs and config tables.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Sdz => "sdz",
            Category::KabinetLora => "kabinet_lora",
            Category::Photo => "photo",
            Category::Zavtracast => "zavtracast",
        }
    }

    /// Resolves a `?type=` value. Missing or unknown values select the catch-all.
    pub fn from_query(value: Option<&str>) -> Category {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Category::Zavtracast)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Maps an episode title to its category.
///
/// Rules are checked in order and the first match wins. Matching is a literal,
/// case-sensitive substring/prefix test on the title exactly as published.
pub fn classify(title: &str) -> Category {
    if title.contains(SDZ_MARKER) {
        return Category::Sdz;
    }
    if title.starts_with(KABINET_LORA_PREFIX) || title == KABINET_LORA_SPECIAL {
        return Category::KabinetLora;
    }
    if title.contains(PHOTO_MARKER) {
        return Category::Photo;
    }
    Category::Zavtracast
}
