use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::review::Review;

pub const RECENT_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub average: f64,
    pub count: usize,
    pub recent_count: usize,
}

impl Stats {
    /// Average with one decimal, as shown next to the stars.
    pub fn average_display(&self) -> String {
        format!("{:.1}", self.average)
    }
}

/// Mean rating, count and recent count over approved records only.
pub fn compute_stats(reviews: &[Review], now: DateTime<Utc>) -> Stats {
    let approved: Vec<&Review> = reviews.iter().filter(|r| r.approved).collect();
    if approved.is_empty() {
        return Stats {
            average: 0.0,
            count: 0,
            recent_count: 0,
        };
    }

    let total: u32 = approved.iter().map(|r| u32::from(r.rating.value())).sum();
    let cutoff = now - TimeDelta::days(RECENT_DAYS);
    let recent_count = approved.iter().filter(|r| r.created_at > cutoff).count();

    Stats {
        average: f64::from(total) / approved.len() as f64,
        count: approved.len(),
        recent_count,
    }
}
