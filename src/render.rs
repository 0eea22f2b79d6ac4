use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::review::{Review, sort_newest_first};
use crate::stats::Stats;
use crate::templates::{self, Templates, html_escape};

/// Content longer than this many chars may be collapsed.
pub const COLLAPSE_THRESHOLD: usize = 200;
/// The first few visible cards always start expanded.
pub const ALWAYS_EXPANDED: usize = 3;

const FILLED_STAR: &str = r#"<i class="fas fa-star"></i>"#;
const EMPTY_STAR: &str = r#"<i class="far fa-star"></i>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stars {
    pub filled: u8,
    pub empty: u8,
}

impl Stars {
    pub fn text(&self) -> String {
        "★".repeat(self.filled.into()) + &"☆".repeat(self.empty.into())
    }

    pub fn html(&self) -> String {
        FILLED_STAR.repeat(self.filled.into()) + &EMPTY_STAR.repeat(self.empty.into())
    }
}

/// Exactly `rating` filled and `5 - rating` empty stars; values above five clamp.
pub fn stars(rating: u8) -> Stars {
    let filled = rating.min(5);
    Stars {
        filled,
        empty: 5 - filled,
    }
}

/// Display-ready card for one review. Text fields are raw; see
/// [`CardView::escaped`] before placing them in markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub name: String,
    pub initial: String,
    pub rating: u8,
    pub stars_html: String,
    pub rating_label: String,
    pub verified: bool,
    pub pending: bool,
    pub source_url: Option<String>,
    pub date_long: String,
    pub date_short: String,
    pub tour: String,
    pub content: String,
    pub collapsible: bool,
    pub collapsed: bool,
    pub comments_label: String,
}

impl CardView {
    fn new(review: &Review, index: usize, toggled: bool) -> Self {
        let collapsible = review.content.chars().count() > COLLAPSE_THRESHOLD;
        let collapsed = collapsible && ((index >= ALWAYS_EXPANDED) != toggled);
        let content = if collapsed {
            let head: String = review.content.chars().take(COLLAPSE_THRESHOLD).collect();
            format!("{head}...")
        } else {
            review.content.clone()
        };
        let comments_label = match review.comments {
            0 => String::new(),
            1 => " · 1 comment".to_string(),
            n => format!(" · {n} comments"),
        };

        Self {
            id: review.id.clone(),
            name: review.name.clone(),
            initial: review.avatar_initial(),
            rating: review.rating.value(),
            stars_html: stars(review.rating.value()).html(),
            rating_label: format!("{}.0", review.rating),
            verified: review.verified,
            pending: review.pending,
            source_url: review.source_url.clone(),
            date_long: review.created_at.format("%B %-d, %Y").to_string(),
            date_short: review.created_at.format("%b %Y").to_string(),
            tour: review.tour.clone(),
            content,
            collapsible,
            collapsed,
            comments_label,
        }
    }

    /// Copy with every user-supplied field HTML-escaped.
    pub fn escaped(&self) -> Self {
        Self {
            id: html_escape(&self.id),
            name: html_escape(&self.name),
            initial: html_escape(&self.initial),
            source_url: self.source_url.as_deref().map(html_escape),
            tour: html_escape(&self.tour),
            content: html_escape(&self.content),
            ..self.clone()
        }
    }
}

/// Approved, verified or pending records, newest first.
pub fn displayed(reviews: &[Review]) -> Vec<Review> {
    let mut shown: Vec<Review> = reviews
        .iter()
        .filter(|r| r.is_displayable())
        .cloned()
        .collect();
    sort_newest_first(&mut shown);
    shown
}

fn window(page_size: usize, pages: usize, len: usize) -> usize {
    page_size.saturating_mul(pages).min(len)
}

/// Cards for the first `page_offset + 1` pages of the displayed set.
pub fn render(reviews: &[Review], page_size: usize, page_offset: usize) -> Vec<CardView> {
    let shown = displayed(reviews);
    let limit = window(page_size, page_offset.saturating_add(1), shown.len());
    shown[..limit]
        .iter()
        .enumerate()
        .map(|(i, r)| CardView::new(r, i, false))
        .collect()
}

/// View state of the review board: the displayed records, how many pages
/// are open, which cards the visitor flipped and an optional error banner.
#[derive(Debug, Clone)]
pub struct ReviewBoard {
    shown: Vec<Review>,
    hidden: usize,
    page_size: usize,
    pages: usize,
    toggled: HashSet<String>,
    banner: Option<String>,
}

#[derive(Serialize)]
struct StatsView {
    average: String,
    stars_html: String,
    count: usize,
    recent_count: usize,
}

#[derive(Serialize)]
struct BoardContext {
    stats: StatsView,
    banner: Option<String>,
    empty: bool,
    only_hidden: bool,
    hidden_count: usize,
    cards: Vec<CardView>,
    has_more: bool,
    remaining: usize,
}

impl ReviewBoard {
    pub fn new(reviews: Vec<Review>, page_size: usize) -> Self {
        let mut board = Self {
            shown: Vec::new(),
            hidden: 0,
            page_size: page_size.max(1),
            pages: 1,
            toggled: HashSet::new(),
            banner: None,
        };
        board.refresh(reviews);
        board
    }

    pub fn displayed(&self) -> &[Review] {
        &self.shown
    }

    pub fn visible_len(&self) -> usize {
        window(self.page_size, self.pages, self.shown.len())
    }

    pub fn visible(&self) -> Vec<CardView> {
        self.shown[..self.visible_len()]
            .iter()
            .enumerate()
            .map(|(i, r)| CardView::new(r, i, self.toggled.contains(&r.id)))
            .collect()
    }

    /// Displayed records beyond the visible window.
    pub fn remaining(&self) -> usize {
        self.shown.len() - self.visible_len()
    }

    /// Records that exist but may not be shown (awaiting moderation).
    pub fn hidden_count(&self) -> usize {
        self.hidden
    }

    /// Open one more page. Returns false when everything is already visible.
    pub fn load_more(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.pages += 1;
        debug!(visible = self.visible_len(), "loaded more reviews");
        true
    }

    /// Replace the records and go back to the first page with default
    /// collapse states.
    pub fn refresh(&mut self, reviews: Vec<Review>) {
        let total = reviews.len();
        self.shown = displayed(&reviews);
        self.hidden = total - self.shown.len();
        self.pages = 1;
        self.toggled.clear();
        self.banner = None;
    }

    /// Put a just-submitted record at the top of the board.
    pub fn prepend(&mut self, review: Review) {
        self.shown.insert(0, review);
    }

    /// Flip expand/collapse for a visible record. Unknown ids are ignored.
    pub fn toggle(&mut self, id: &str) -> bool {
        let visible = &self.shown[..self.visible_len()];
        if !visible.iter().any(|r| r.id == id) {
            debug!(id, "toggle ignored for unknown review");
            return false;
        }
        if !self.toggled.remove(id) {
            self.toggled.insert(id.to_string());
        }
        true
    }

    pub fn set_banner(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn to_html(&self, templates: &Templates, stats: &Stats) -> Result<String> {
        let ctx = BoardContext {
            stats: StatsView {
                average: stats.average_display(),
                stars_html: stars(stats.average.round() as u8).html(),
                count: stats.count,
                recent_count: stats.recent_count,
            },
            banner: self.banner.as_deref().map(html_escape),
            empty: self.shown.is_empty() && self.hidden == 0,
            only_hidden: self.shown.is_empty() && self.hidden > 0,
            hidden_count: self.hidden_count(),
            cards: self.visible().iter().map(CardView::escaped).collect(),
            has_more: self.remaining() > 0,
            remaining: self.remaining(),
        };
        templates.render(templates::BOARD, ctx)
    }
}
