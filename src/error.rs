use std::path::PathBuf;

/// Rejections from the review form, reported inline and never propagated
/// past the submission flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please fill in all required fields (name, email, review)")]
    MissingFields,

    #[error("please select a rating")]
    RatingNotSelected,

    #[error("please agree to the terms to submit your review")]
    ConsentRequired,

    #[error("please write a review with at least 50 characters (got {0})")]
    ContentTooShort(usize),

    #[error("review must be at most 1000 characters (got {0})")]
    ContentTooLong(usize),

    #[error("please enter a valid email address")]
    InvalidEmail,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("navigation error: {0}")]
    Navigation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
