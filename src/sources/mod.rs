pub mod github;
pub mod local;

use std::fmt;

use serde::Deserialize;

use crate::error::Result;
use crate::review::Review;

/// Which backing store a review list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    #[default]
    Remote,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Local => f.write_str("local"),
            SourceKind::Remote => f.write_str("remote"),
        }
    }
}

pub trait ReviewSource {
    /// Fetch every review the store holds, normalized and newest-first.
    fn fetch_reviews(&self) -> Result<Vec<Review>>;

    fn kind(&self) -> SourceKind;
}

pub enum AnySource<S> {
    Local(local::LocalSource<S>),
    Remote(github::GitHubSource),
}

impl<S: crate::store::KeyValueStore> ReviewSource for AnySource<S> {
    fn fetch_reviews(&self) -> Result<Vec<Review>> {
        match self {
            AnySource::Local(s) => s.fetch_reviews(),
            AnySource::Remote(s) => s.fetch_reviews(),
        }
    }

    fn kind(&self) -> SourceKind {
        match self {
            AnySource::Local(s) => s.kind(),
            AnySource::Remote(s) => s.kind(),
        }
    }
}
