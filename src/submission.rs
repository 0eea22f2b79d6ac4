use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result, ValidationError};
use crate::links::{self, Channel, DeepLink, Navigator};
use crate::render::{ReviewBoard, stars};
use crate::review::{DEFAULT_TOUR, Rating, Review};
use crate::sources::local::LocalSource;
use crate::store::KeyValueStore;
use crate::templates::{self, Templates};

pub const MIN_CONTENT_CHARS: usize = 50;
pub const MAX_CONTENT_CHARS: usize = 1000;
const GENERAL_REVIEW: &str = "General Review";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// What a visitor typed into the review form. A rating of 0 means none was
/// picked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewDraft {
    pub name: String,
    pub email: String,
    pub rating: u8,
    pub tour: Option<String>,
    pub content: String,
    pub consent: bool,
}

impl ReviewDraft {
    fn tour(&self) -> Option<&str> {
        self.tour.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Check a draft, stopping at the first problem in form order.
pub fn validate(
    draft: &ReviewDraft,
    require_consent: bool,
) -> std::result::Result<(), ValidationError> {
    let content = draft.content.trim();
    if draft.name.trim().is_empty() || draft.email.trim().is_empty() || content.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if Rating::new(draft.rating).is_none() {
        return Err(ValidationError::RatingNotSelected);
    }
    if require_consent && !draft.consent {
        return Err(ValidationError::ConsentRequired);
    }
    let len = content.chars().count();
    if len < MIN_CONTENT_CHARS {
        return Err(ValidationError::ContentTooShort(len));
    }
    if len > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong(len));
    }
    if !EMAIL.is_match(draft.email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// A draft that passed validation, with everything needed to send it off.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub pending: Review,
    pub links: Vec<DeepLink>,
    pub message: String,
}

#[derive(Serialize)]
struct MessageContext<'a> {
    name: &'a str,
    email: &'a str,
    rating: u8,
    stars: String,
    tour: &'a str,
    content: &'a str,
    submitted: String,
}

/// Validate the draft and compose the pending record and one deep link per
/// channel. An empty channel list means the configured channels.
pub fn prepare(
    draft: &ReviewDraft,
    channels: &[Channel],
    config: &Config,
    templates: &Templates,
    now: DateTime<Utc>,
) -> Result<Accepted> {
    validate(draft, config.require_consent)?;

    let name = draft.name.trim();
    let email = draft.email.trim();
    let content = draft.content.trim();
    let rating = Rating::new(draft.rating).unwrap_or_default();
    let ctx = MessageContext {
        name,
        email,
        rating: rating.value(),
        stars: stars(rating.value()).text(),
        tour: draft.tour().unwrap_or(DEFAULT_TOUR),
        content,
        submitted: now.format("%Y-%m-%d %H:%M UTC").to_string(),
    };
    let message = templates.render(templates::CHAT_MESSAGE, &ctx)?;

    let channels = if channels.is_empty() {
        &config.channels[..]
    } else {
        channels
    };
    let mut links = Vec::new();
    for channel in channels {
        if links.iter().any(|l: &DeepLink| l.channel == *channel) {
            continue;
        }
        links.push(deep_link(*channel, &ctx, &message, draft, config, templates)?);
    }

    let pending = Review {
        id: format!("local-{}", now.timestamp_millis()),
        issue_number: None,
        name: name.to_string(),
        email: email.to_string(),
        tour: ctx.tour.to_string(),
        content: content.to_string(),
        rating,
        created_at: now,
        approved: false,
        verified: false,
        pending: true,
        source_url: None,
        comments: 0,
        labels: Vec::new(),
    };

    Ok(Accepted {
        pending,
        links,
        message,
    })
}

fn deep_link(
    channel: Channel,
    ctx: &MessageContext<'_>,
    message: &str,
    draft: &ReviewDraft,
    config: &Config,
    templates: &Templates,
) -> Result<DeepLink> {
    match channel {
        Channel::Github => {
            let (owner, repo) = config.repository()?;
            let title = format!(
                "Review from {} - {}",
                ctx.name,
                draft.tour().unwrap_or(GENERAL_REVIEW)
            );
            let body = templates.render(templates::ISSUE_BODY, ctx)?;
            Ok(links::issue_link(
                &config.web_base,
                owner,
                repo,
                &title,
                body.trim(),
                &config.label,
            ))
        }
        Channel::Whatsapp => {
            let number = config.whatsapp_number.as_deref().ok_or_else(|| {
                Error::ConfigValidation("whatsapp channel requires whatsapp_number".to_string())
            })?;
            Ok(links::whatsapp_link(number, message.trim()))
        }
        Channel::Email => {
            let address = config.contact_email.as_deref().ok_or_else(|| {
                Error::ConfigValidation("email channel requires contact_email".to_string())
            })?;
            let subject = format!("New review from {}", ctx.name);
            let body = templates.render(templates::EMAIL_BODY, ctx)?;
            Ok(links::mailto_link(address, &subject, body.trim()))
        }
    }
}

/// Submission wiring: validation, deep links, local persistence and the board.
pub struct SubmissionFlow<'a, S, N: ?Sized> {
    config: &'a Config,
    templates: &'a Templates,
    local: &'a LocalSource<S>,
    navigator: &'a N,
}

impl<'a, S: KeyValueStore, N: Navigator + ?Sized> SubmissionFlow<'a, S, N> {
    pub fn new(
        config: &'a Config,
        templates: &'a Templates,
        local: &'a LocalSource<S>,
        navigator: &'a N,
    ) -> Self {
        Self {
            config,
            templates,
            local,
            navigator,
        }
    }

    /// Accept a draft: open its deep links in order, then record it as
    /// pending in the local store and at the top of the board. Navigation and
    /// store failures are logged; only validation and configuration errors
    /// are returned.
    pub async fn submit(
        &self,
        draft: &ReviewDraft,
        channels: &[Channel],
        board: &mut ReviewBoard,
        now: DateTime<Utc>,
    ) -> Result<Accepted> {
        let accepted = prepare(draft, channels, self.config, self.templates, now)?;

        let delay = Duration::from_millis(self.config.link_delay_ms);
        let opened = links::open_all(self.navigator, &accepted.links, delay).await;

        if let Err(e) = self.local.append(&accepted.pending) {
            warn!(error = %e, "failed to save pending review locally");
        }
        board.prepend(accepted.pending.clone());

        info!(
            id = %accepted.pending.id,
            links = accepted.links.len(),
            opened,
            "review submitted for moderation"
        );
        Ok(accepted)
    }
}
