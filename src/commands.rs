use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cache::ReviewCache;
use crate::cli::CliCommand;
use crate::config::Config;
use crate::error::Result;
use crate::links::{Channel, CommandNavigator, Navigator, PrintNavigator};
use crate::loader::{LoadEvent, ReviewLoader};
use crate::render::{ReviewBoard, stars};
use crate::sources::github::GitHubSource;
use crate::sources::local::LocalSource;
use crate::sources::{AnySource, SourceKind};
use crate::stats::compute_stats;
use crate::store::FileStore;
use crate::submission::{ReviewDraft, SubmissionFlow};
use crate::templates::Templates;

/// Run one subcommand and return what it prints on stdout.
pub async fn dispatch(command: &CliCommand, config: &Config) -> Result<String> {
    let now = Utc::now();
    match command {
        CliCommand::Show {
            pages,
            toggle,
            refresh,
        } => run_show(config, *pages, toggle, *refresh, now),
        CliCommand::Stats => run_stats(config, now),
        CliCommand::Submit {
            name,
            email,
            rating,
            tour,
            content,
            content_file,
            consent,
            via,
        } => {
            let content = match (content, content_file) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => String::new(),
            };
            let draft = ReviewDraft {
                name: name.clone(),
                email: email.clone(),
                rating: *rating,
                tour: tour.clone(),
                content,
                consent: *consent,
            };
            run_submit(config, &draft, via, now).await
        }
        CliCommand::ClearCache => run_clear_cache(config),
    }
}

fn store(config: &Config) -> FileStore {
    FileStore::new(&config.store_dir)
}

fn templates(config: &Config) -> Result<Templates> {
    Templates::new(config.template_dir.as_deref().map(Path::new))
}

fn source(config: &Config, store: &FileStore) -> Result<AnySource<FileStore>> {
    Ok(match config.source {
        SourceKind::Local => AnySource::Local(LocalSource::new(store.clone())),
        SourceKind::Remote => AnySource::Remote(GitHubSource::new(config)?),
    })
}

/// Load reviews into a fresh board, applying every loader event in order.
pub fn load_board(config: &Config, now: DateTime<Utc>) -> Result<ReviewBoard> {
    let store = store(config);
    let source = source(config, &store)?;
    let cache = ReviewCache::new(store.clone(), config.cache);
    let local = LocalSource::new(store);

    let mut board = ReviewBoard::new(Vec::new(), config.page_size);
    ReviewLoader::new(&source, &cache, &local).load(now, |event| match event {
        LoadEvent::Cached(reviews) | LoadEvent::Fresh(reviews) => board.refresh(reviews),
        LoadEvent::Failed {
            fallback, banner, ..
        } => {
            board.refresh(fallback);
            board.set_banner(banner);
        }
    });
    Ok(board)
}

pub fn run_show(
    config: &Config,
    pages: usize,
    toggles: &[String],
    refresh: bool,
    now: DateTime<Utc>,
) -> Result<String> {
    if refresh {
        ReviewCache::new(store(config), config.cache).clear()?;
        info!("review cache cleared before refresh");
    }

    let mut board = load_board(config, now)?;
    for _ in 1..pages {
        if !board.load_more() {
            break;
        }
    }
    for id in toggles {
        if !board.toggle(id) {
            warn!(%id, "no visible review with this id");
        }
    }

    let stats = compute_stats(board.displayed(), now);
    board.to_html(&templates(config)?, &stats)
}

pub fn run_stats(config: &Config, now: DateTime<Utc>) -> Result<String> {
    let board = load_board(config, now)?;
    let stats = compute_stats(board.displayed(), now);

    let mut out = format!(
        "Average rating: {} {}\nApproved reviews: {}\nLast {} days: {}\n",
        stats.average_display(),
        stars(stats.average.round() as u8).text(),
        stats.count,
        crate::stats::RECENT_DAYS,
        stats.recent_count,
    );
    if board.hidden_count() > 0 {
        out.push_str(&format!("Awaiting approval: {}\n", board.hidden_count()));
    }
    if let Some(banner) = board.banner() {
        out.push_str(&format!("Note: {banner}\n"));
    }
    Ok(out)
}

pub async fn run_submit(
    config: &Config,
    draft: &ReviewDraft,
    channels: &[Channel],
    now: DateTime<Utc>,
) -> Result<String> {
    let templates = templates(config)?;
    let local = LocalSource::new(store(config));
    let navigator: Box<dyn Navigator> = if config.dry_run {
        Box::new(PrintNavigator)
    } else {
        Box::new(CommandNavigator::new(&config.opener))
    };

    let mut board = ReviewBoard::new(Vec::new(), config.page_size);
    let flow = SubmissionFlow::new(config, &templates, &local, navigator.as_ref());
    let accepted = flow.submit(draft, channels, &mut board, now).await?;

    Ok(format!(
        "Thank you! Your review {} was submitted and is pending moderation.\n",
        accepted.pending.id
    ))
}

pub fn run_clear_cache(config: &Config) -> Result<String> {
    ReviewCache::new(store(config), config.cache).clear()?;
    Ok("Review cache cleared.\n".to_string())
}
