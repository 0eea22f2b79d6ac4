use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME: &str = "Anonymous";
pub const DEFAULT_TOUR: &str = "Not specified";

/// Star rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Returns `None` outside 1..=5.
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Rating(value))
    }

    /// Parse a rating, falling back to five stars for anything unusable.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.trim()
            .parse::<u8>()
            .ok()
            .and_then(Rating::new)
            .unwrap_or_default()
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating(Self::MAX)
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating out of range: {value}"))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized testimonial, regardless of which store it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub tour: String,
    pub content: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Review {
    pub fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Whether the record may be shown on the public board.
    pub fn is_displayable(&self) -> bool {
        self.approved || self.verified || self.pending
    }

    pub fn avatar_initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// Order newest-first. The sort is stable, so equal timestamps keep their
/// insertion order.
pub fn sort_newest_first(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
