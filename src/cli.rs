use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::links::Channel;
use crate::sources::SourceKind;

/// skyreview: tour review board for fetching, rendering and submitting reviews
#[derive(Parser, Debug, Clone)]
#[command(name = "skyreview", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to config file (default: .skyreview.toml if present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Review source to use (local, remote)
    #[arg(long, global = true, value_enum)]
    pub source: Option<SourceKind>,

    /// Directory holding the local store and cache
    #[arg(long, global = true)]
    pub store_dir: Option<String>,

    /// Reviews per page
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    /// Print deep links instead of opening them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Render the review board as HTML
    Show {
        /// Number of pages to show ("load more" presses + 1)
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Toggle expand/collapse for a review id (repeatable)
        #[arg(long = "toggle", value_name = "ID")]
        toggle: Vec<String>,

        /// Drop the cache before loading
        #[arg(long)]
        refresh: bool,
    },

    /// Print rating statistics over approved reviews
    Stats,

    /// Validate a review, open the deep links and record it as pending
    Submit {
        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        email: String,

        /// Star rating, 1-5 (0 means not selected)
        #[arg(long, default_value_t = 0)]
        rating: u8,

        #[arg(long)]
        tour: Option<String>,

        /// Review text
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the review text from a file
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Agree to the publishing terms
        #[arg(long)]
        consent: bool,

        /// Channel to send the review through (repeatable)
        #[arg(long = "via", value_enum)]
        via: Vec<Channel>,
    },

    /// Remove the cached remote review list
    ClearCache,
}
